//! # Reconciler Errors
//!
//! Per-step failures and the composite error a reconciliation returns.

use std::fmt;
use thiserror::Error;

use crate::controller::action::ActionError;
use crate::controller::capability::ProbeError;
use crate::controller::store::{ObjectKey, StoreError};

/// A single failed step of the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("action {action} failed: {source}")]
    Action {
        action: &'static str,
        #[source]
        source: ActionError,
    },

    #[error("cleanup for action {action} failed: {source}")]
    Cleanup {
        action: &'static str,
        #[source]
        source: ActionError,
    },

    #[error("failed to persist status: {0}")]
    Persist(#[source] StoreError),
}

/// Every failure of one reconciliation, in the order they happened
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<PipelineError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: PipelineError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[PipelineError] {
        &self.errors
    }

    /// `Ok` when nothing failed
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.errors
            .first()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl IntoIterator for AggregateError {
    type Item = PipelineError;
    type IntoIter = std::vec::IntoIter<PipelineError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: ObjectKey,
        #[source]
        source: StoreError,
    },

    #[error("{0}")]
    Pipeline(AggregateError),

    #[error("cluster capability detection failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("action {action} failed to configure watches: {source}")]
    Configure {
        action: &'static str,
        #[source]
        source: ActionError,
    },
}

impl ReconcilerError {
    /// Individual causes when the pipeline failed, empty otherwise
    pub fn pipeline_errors(&self) -> &[PipelineError] {
        match self {
            ReconcilerError::Pipeline(aggregate) => aggregate.errors(),
            _ => &[],
        }
    }
}
