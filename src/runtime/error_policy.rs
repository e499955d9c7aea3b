//! # Error Policy
//!
//! Retry scheduling for failed reconciliations.

use kube_runtime::controller::Action as ControllerAction;
use std::sync::Arc;
use tracing::{error, info};

use crate::controller::reconciler::ReconcilerError;
use crate::controller::store::ObjectKey;
use crate::crd::Workspace;
use crate::observability;
use crate::runtime::context::Context;

/// Requeue a failed reconciliation with per-resource Fibonacci backoff
pub fn error_policy(
    workspace: Arc<Workspace>,
    error: &ReconcilerError,
    ctx: Arc<Context>,
) -> ControllerAction {
    let key = ObjectKey::from_resource(workspace.as_ref());
    let error_span = tracing::error_span!(
        "workspace.reconcile.error",
        resource.namespace = %key.namespace,
        resource.name = %key.name,
    );
    let _guard = error_span.enter();

    error!(error = %error, "Reconciliation failed");
    for cause in error.pipeline_errors() {
        error!(cause = %cause, "Reconciliation failure cause");
    }
    observability::metrics::increment_reconciliation_errors();

    let (delay, error_count) = ctx.backoff.next_delay(&key);
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        delay_secs = delay.as_secs(),
        error_count,
        next_retry = %next_trigger_time.to_rfc3339(),
        "Retrying with Fibonacci backoff"
    );

    observability::metrics::increment_requeues_total("error-backoff");
    ControllerAction::requeue(delay)
}
