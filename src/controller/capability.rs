//! # Cluster Capability Detection
//!
//! Classifies the target cluster once at startup. The result is carried on
//! every reconciliation request so actions can branch on the platform flavor.

use async_trait::async_trait;
use kube::Client;
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::constants::OPENSHIFT_API_GROUP;

/// Platform flavor of the target cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterType {
    #[default]
    Vanilla,
    OpenShift,
}

impl fmt::Display for ClusterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClusterType::Vanilla => f.write_str("Vanilla"),
            ClusterType::OpenShift => f.write_str("OpenShift"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("API discovery failed: {0}")]
    Discovery(#[from] kube::Error),

    #[error("cluster capabilities unavailable: {0}")]
    Unavailable(String),
}

/// Source of the cluster classification
#[async_trait]
pub trait CapabilityProber: Send + Sync {
    async fn probe(&self) -> Result<ClusterType, ProbeError>;
}

/// Probes the API server's group discovery endpoint
#[derive(Clone)]
pub struct DiscoveryProber {
    client: Client,
}

impl fmt::Debug for DiscoveryProber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoveryProber").finish_non_exhaustive()
    }
}

impl DiscoveryProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CapabilityProber for DiscoveryProber {
    async fn probe(&self) -> Result<ClusterType, ProbeError> {
        let groups = self.client.list_api_groups().await?;
        let names: Vec<&str> = groups.groups.iter().map(|g| g.name.as_str()).collect();
        debug!(groups = names.len(), "Discovered API groups");
        Ok(cluster_type_from_groups(names))
    }
}

/// OpenShift when the route API group is served, Vanilla otherwise
pub fn cluster_type_from_groups<'a>(groups: impl IntoIterator<Item = &'a str>) -> ClusterType {
    if groups.into_iter().any(|g| g == OPENSHIFT_API_GROUP) {
        ClusterType::OpenShift
    } else {
        ClusterType::Vanilla
    }
}
