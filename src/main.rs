//! # Workspace Operator
//!
//! A Kubernetes operator that reconciles `Workspace` resources.
//!
//! ## Overview
//!
//! For every Workspace the operator runs a pipeline of idempotent actions,
//! each converging one owned resource with server-side apply, and reports the
//! outcome through the Workspace status:
//!
//! - **phase** - `Ready` once every action converged, `Error` otherwise
//! - **observedGeneration** - the generation the last successful pass converged
//! - **conditions** - one per concern (`Reconcile`, `Deployment`), sorted by type
//!
//! ## Usage
//!
//! ```bash
//! workspace-operator run --namespace team-a --concurrency 8
//! ```

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use workspace_operator::config::OperatorConfig;
use workspace_operator::runtime::initialization::initialize;
use workspace_operator::runtime::watch_loop::run_watch_loop;

#[derive(Parser)]
#[command(name = "workspace-operator")]
#[command(about = "Kubernetes operator reconciling Workspace resources", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the operator against the current cluster
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Port for the metrics and health probe server (overrides METRICS_PORT)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Number of Workspaces reconciled in parallel (overrides CONTROLLER_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<u16>,

    /// Only watch this namespace (overrides WATCH_NAMESPACE)
    #[arg(short, long)]
    namespace: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            let config = OperatorConfig::from_env().with_overrides(
                args.metrics_port,
                args.concurrency,
                args.namespace,
            );

            let init = initialize(&config).await?;
            run_watch_loop(init.client, &config, init.context, init.server_state).await?;
            // The watch loop cancels the shared token, which stops the server
            let _ = init.server_handle.await;
        }
    }

    Ok(())
}
