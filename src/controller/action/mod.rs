//! # Actions
//!
//! An action is one idempotent unit of reconciliation work. The reconciler
//! runs its actions in order on every pass; each action records its outcome as
//! a condition on the request's resource.
//!
//! - `configure` runs once at startup and registers the watches the action needs
//! - `apply` converges the state the action owns
//! - `cleanup` releases external state when the resource goes away

mod deploy;

pub use deploy::DeployAction;

use async_trait::async_trait;
use thiserror::Error;

use crate::controller::convergence::ConvergeError;
use crate::controller::reconciler::ReconciliationRequest;
use crate::controller::scheme::SchemeError;
use crate::controller::store::ObjectKey;
use crate::controller::watch::WatchBuilder;
use crate::crd::ReconciledResource;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error(transparent)]
    Converge(#[from] ConvergeError),

    #[error(transparent)]
    Scheme(#[from] SchemeError),

    #[error("reconciliation of {0} was cancelled")]
    Cancelled(ObjectKey),
}

#[async_trait]
pub trait Action<K>: Send + Sync
where
    K: ReconciledResource,
{
    /// Short name used in logs and metric labels
    fn name(&self) -> &'static str;

    /// Register the watches this action depends on
    fn configure(&self, watches: &mut WatchBuilder<K>) -> Result<(), ActionError>;

    /// Converge owned state and record the outcome on `request.resource`
    async fn apply(&self, request: &mut ReconciliationRequest<K>) -> Result<(), ActionError>;

    async fn cleanup(&self, request: &mut ReconciliationRequest<K>) -> Result<(), ActionError> {
        let _ = request;
        Ok(())
    }
}
