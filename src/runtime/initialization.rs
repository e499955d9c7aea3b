//! # Initialization
//!
//! Operator startup: rustls setup, tracing, metrics, HTTP server, Kubernetes
//! client and the Workspace reconciler.

use anyhow::{Context as _, Result};
use kube::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::{OperatorConfig, ServerConfig};
use crate::controller::backoff::BackoffTracker;
use crate::controller::scheme::operator_scheme;
use crate::controller::server::{start_server, ServerState};
use crate::controller::workspace::new_workspace_reconciler;
use crate::observability;
use crate::runtime::context::Context;

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<Context>,
    pub server_state: Arc<ServerState>,
    pub server_handle: JoinHandle<()>,
}

/// Initialize the operator runtime
///
/// Installs the rustls crypto provider, sets up tracing and metrics, starts
/// the HTTP server and waits for it, then connects to the cluster and builds
/// the Workspace reconciler (which probes the cluster flavor).
pub async fn initialize(config: &OperatorConfig) -> Result<InitializationResult> {
    // Required for rustls 0.23+ before any TLS connection is made
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "workspace_operator=info".into()),
        )
        .init();

    info!("Starting Workspace Operator");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let shutdown = CancellationToken::new();
    let server_state = Arc::new(ServerState::new());
    let server_port = config.server.metrics_port;
    let server_handle = {
        let state = Arc::clone(&server_state);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = start_server(server_port, state, shutdown).await {
                error!("HTTP server error: {:#}", e);
            }
        })
    };
    wait_for_server_ready(&server_state, &server_handle, &config.server).await?;

    let client = Client::try_default()
        .await
        .context("failed to create Kubernetes client")?;

    let scheme = Arc::new(operator_scheme());
    let reconciler = new_workspace_reconciler(client.clone(), scheme)
        .await
        .context("failed to construct Workspace reconciler")?;
    info!(
        cluster_type = %reconciler.cluster_type(),
        actions = ?reconciler.action_names(),
        "Workspace reconciler ready"
    );

    let backoff = BackoffTracker::new(
        config.controller.error_backoff_min_secs,
        config.controller.error_backoff_max_secs,
    );
    let context = Arc::new(Context::new(reconciler, backoff, shutdown));

    Ok(InitializationResult {
        client,
        context,
        server_state,
        server_handle,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &ServerState,
    server_handle: &JoinHandle<()>,
    config: &ServerConfig,
) -> Result<()> {
    let startup_timeout = Duration::from_secs(config.startup_timeout_secs);
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}
