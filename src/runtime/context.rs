//! # Controller Context
//!
//! Shared state handed to every reconcile invocation, and the adapter between
//! the kube-runtime controller and the Workspace reconciler.

use kube_runtime::controller::Action as ControllerAction;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};

use crate::controller::backoff::BackoffTracker;
use crate::controller::reconciler::{ReconcileOutcome, Reconciler, ReconcilerError};
use crate::controller::store::ObjectKey;
use crate::crd::Workspace;
use crate::observability;

#[derive(Debug)]
pub struct Context {
    pub reconciler: Reconciler<Workspace>,
    pub backoff: BackoffTracker,
    /// Cancelled on shutdown; every invocation receives a child token
    pub shutdown: CancellationToken,
}

impl Context {
    pub fn new(
        reconciler: Reconciler<Workspace>,
        backoff: BackoffTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            reconciler,
            backoff,
            shutdown,
        }
    }
}

/// Reconcile entry point for the kube-runtime controller
pub async fn reconcile(
    workspace: Arc<Workspace>,
    ctx: Arc<Context>,
) -> Result<ControllerAction, ReconcilerError> {
    let key = ObjectKey::from_resource(workspace.as_ref());
    let span = info_span!(
        "workspace.reconcile",
        resource.namespace = %key.namespace,
        resource.name = %key.name,
    );
    reconcile_workspace(key, ctx).instrument(span).await
}

async fn reconcile_workspace(
    key: ObjectKey,
    ctx: Arc<Context>,
) -> Result<ControllerAction, ReconcilerError> {
    observability::metrics::increment_reconciliations();
    let start = Instant::now();

    let result = ctx
        .reconciler
        .reconcile(&key, ctx.shutdown.child_token())
        .await;
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    match result? {
        ReconcileOutcome::Done => {
            debug!("Reconciliation complete");
            ctx.backoff.reset(&key);
            Ok(ControllerAction::await_change())
        }
        ReconcileOutcome::Requeue => {
            observability::metrics::increment_requeues_total("conflict");
            Ok(ControllerAction::requeue(Duration::ZERO))
        }
    }
}
