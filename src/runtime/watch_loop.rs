//! # Watch Loop
//!
//! Builds the controller from the reconciler's watch registrations and runs
//! it until a shutdown signal arrives.

use anyhow::Result;
use futures::channel::oneshot;
use futures::StreamExt;
use kube::runtime::controller::Config as ControllerConfig;
use kube::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::OperatorConfig;
use crate::controller::server::ServerState;
use crate::controller::watch::{WatchBuilder, WatchScope};
use crate::crd::Workspace;
use crate::runtime::context::{reconcile, Context};
use crate::runtime::error_policy::error_policy;

/// Run the Workspace controller until SIGTERM or Ctrl-C
///
/// On shutdown the context's cancellation token fires so in-flight actions
/// stop early, and the controller drains before this returns.
pub async fn run_watch_loop(
    client: Client,
    config: &OperatorConfig,
    context: Arc<Context>,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let mut watches = WatchBuilder::<Workspace>::new();
    context.reconciler.configure(&mut watches)?;

    if let Some(primary) = watches.primary() {
        info!(watch = %primary, "Watching primary resources");
    }
    for owned in watches.owned() {
        info!(watch = %owned, "Watching owned resources");
    }

    let scope = WatchScope::new(client, config.controller.namespace.clone());
    info!(
        namespace = scope.namespace.as_deref().unwrap_or("<all>"),
        concurrency = config.controller.concurrency,
        "Starting controller watch loop"
    );

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shutdown = context.shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received, cancelling in-flight reconciliations");
        shutdown.cancel();
        let _ = shutdown_tx.send(());
    });

    watches
        .build(&scope)
        .with_config(ControllerConfig::default().concurrency(config.controller.concurrency))
        .graceful_shutdown_on(async move {
            let _ = shutdown_rx.await;
        })
        .run(reconcile, error_policy, Arc::clone(&context))
        .for_each(|result| async move {
            match result {
                Ok((object, _action)) => {
                    debug!(resource = %object, "Reconciled");
                }
                Err(e) => {
                    warn!(error = %e, "Controller error");
                }
            }
        })
        .await;

    server_state.set_ready(false);
    context.shutdown.cancel();
    info!("Controller stopped");
    Ok(())
}

/// Resolves on the first SIGTERM or Ctrl-C
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
