//! # Workspace Reconciler
//!
//! Wires the Kubernetes-backed collaborators and the Workspace action list.

use kube::Client;
use std::sync::Arc;

use crate::constants::FIELD_MANAGER;
use crate::controller::action::DeployAction;
use crate::controller::capability::DiscoveryProber;
use crate::controller::convergence::KubeConvergenceClient;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::controller::scheme::Scheme;
use crate::controller::store::KubeResourceStore;
use crate::crd::Workspace;

/// Reconciler for `Workspace` resources running against a live cluster
pub async fn new_workspace_reconciler(
    client: Client,
    scheme: Arc<Scheme>,
) -> Result<Reconciler<Workspace>, ReconcilerError> {
    let store = Arc::new(KubeResourceStore::<Workspace>::new(
        client.clone(),
        FIELD_MANAGER,
    ));
    let convergence = Arc::new(KubeConvergenceClient::new(
        client.clone(),
        Arc::clone(&scheme),
        FIELD_MANAGER,
    ));
    let prober = DiscoveryProber::new(client);

    let reconciler = Reconciler::<Workspace>::new(store, convergence, scheme, &prober)
        .await?
        .with_action(DeployAction::new());
    Ok(reconciler)
}
