//! # Reconciler Types
//!
//! Per-invocation request and outcome types.

use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::controller::capability::ClusterType;
use crate::controller::convergence::ConvergenceClient;
use crate::controller::scheme::Scheme;
use crate::controller::store::ObjectKey;

/// Everything an action needs for one reconciliation
///
/// The request owns the loaded resource; actions record their conditions on
/// it and the reconciler persists its status once every action ran.
pub struct ReconciliationRequest<K> {
    pub client: Arc<dyn ConvergenceClient>,
    pub key: ObjectKey,
    pub cluster_type: ClusterType,
    pub scheme: Arc<Scheme>,
    /// Triggered when the controller shuts down
    pub cancel: CancellationToken,
    pub resource: K,
}

impl<K: fmt::Debug> fmt::Debug for ReconciliationRequest<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationRequest")
            .field("key", &self.key)
            .field("cluster_type", &self.cluster_type)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("resource", &self.resource)
            .finish_non_exhaustive()
    }
}

/// How a successful reconciliation finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Nothing left to do until the next watch event
    Done,
    /// The status write lost a race; run again right away
    Requeue,
}
