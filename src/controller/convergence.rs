//! # Convergence Client
//!
//! Applies owned resources with server-side apply so repeated reconciliations
//! converge on the same object without read-modify-write races.

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::Client;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::controller::scheme::{Scheme, SchemeError};

#[derive(Debug, Error)]
pub enum ConvergeError {
    /// The API server refused the apply
    #[error("{message}")]
    Rejected { code: u16, message: String },

    #[error("request failed: {0}")]
    Client(kube::Error),

    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error("{kind} {name} has no controller owner reference")]
    MissingOwner { kind: String, name: String },

    #[error("desired object has no apiVersion/kind")]
    MissingTypeMeta,

    #[error("{kind} has no namespace")]
    MissingNamespace { kind: String },

    #[error("{kind} has no name")]
    MissingName { kind: String },
}

impl From<kube::Error> for ConvergeError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(api_err) => ConvergeError::Rejected {
                code: api_err.code,
                message: api_err.message,
            },
            other => ConvergeError::Client(other),
        }
    }
}

/// Applies desired state for owned resources
#[async_trait]
pub trait ConvergenceClient: Send + Sync {
    /// Server-side apply `desired`, taking ownership of conflicting fields
    async fn apply_owned(&self, desired: DynamicObject) -> Result<DynamicObject, ConvergeError>;
}

/// Where a validated desired object is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyTarget<'a> {
    pub api_version: &'a str,
    pub kind: &'a str,
    pub namespace: &'a str,
    pub name: &'a str,
}

/// Checks a desired object is addressable and owned by a controller
pub fn validate_desired(desired: &DynamicObject) -> Result<ApplyTarget<'_>, ConvergeError> {
    let types = desired.types.as_ref().ok_or(ConvergeError::MissingTypeMeta)?;
    let kind = types.kind.as_str();

    let name = desired
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| ConvergeError::MissingName { kind: kind.to_string() })?;
    let namespace = desired
        .metadata
        .namespace
        .as_deref()
        .ok_or_else(|| ConvergeError::MissingNamespace { kind: kind.to_string() })?;

    let owned = desired
        .metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| refs.iter().any(|r| r.controller == Some(true)));
    if !owned {
        return Err(ConvergeError::MissingOwner {
            kind: kind.to_string(),
            name: name.to_string(),
        });
    }

    Ok(ApplyTarget {
        api_version: &types.api_version,
        kind,
        namespace,
        name,
    })
}

/// Convergence client backed by the Kubernetes API server
pub struct KubeConvergenceClient {
    client: Client,
    scheme: Arc<Scheme>,
    field_manager: String,
}

impl fmt::Debug for KubeConvergenceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeConvergenceClient")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl KubeConvergenceClient {
    pub fn new(client: Client, scheme: Arc<Scheme>, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            scheme,
            field_manager: field_manager.into(),
        }
    }
}

#[async_trait]
impl ConvergenceClient for KubeConvergenceClient {
    async fn apply_owned(&self, desired: DynamicObject) -> Result<DynamicObject, ConvergeError> {
        let target = validate_desired(&desired)?;
        let resource = self.scheme.api_resource(target.api_version, target.kind)?;

        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), target.namespace, resource);
        debug!(
            kind = target.kind,
            namespace = target.namespace,
            name = target.name,
            "Applying owned resource"
        );

        let applied = api
            .patch(
                target.name,
                &PatchParams::apply(&self.field_manager).force(),
                &Patch::Apply(&desired),
            )
            .await?;
        Ok(applied)
    }
}
