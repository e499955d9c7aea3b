//! # Resource Store
//!
//! Read and status-write access to reconciled resources.
//!
//! Status writes carry the `resourceVersion` the reconciler read, so a write
//! racing another writer fails with a conflict instead of overwriting it.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;
use tracing::debug;

use crate::crd::ReconciledResource;

/// Namespace and name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource<K: ResourceExt>(resource: &K) -> Self {
        Self {
            namespace: resource.namespace().unwrap_or_default(),
            name: resource.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored resource changed since it was read
    #[error("conflict writing {key}: {message}")]
    Conflict { key: ObjectKey, message: String },

    #[error("API request for {key} failed: {source}")]
    Api {
        key: ObjectKey,
        #[source]
        source: kube::Error,
    },

    #[error("store backend failed for {key}: {message}")]
    Backend { key: ObjectKey, message: String },
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    pub fn key(&self) -> &ObjectKey {
        match self {
            StoreError::Conflict { key, .. }
            | StoreError::Api { key, .. }
            | StoreError::Backend { key, .. } => key,
        }
    }
}

/// Persistent store for reconciled resources
#[async_trait]
pub trait ResourceStore<K>: Send + Sync
where
    K: ReconciledResource,
{
    /// Fetch the resource, `None` when it does not exist
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError>;

    /// Persist the status block of `resource`
    ///
    /// Fails with [`StoreError::Conflict`] when the stored resource version no
    /// longer matches the one `resource` was read at.
    async fn update_status(&self, resource: &K) -> Result<K, StoreError>;
}

/// Store backed by the Kubernetes API server
pub struct KubeResourceStore<K> {
    client: Client,
    field_manager: String,
    _resource: PhantomData<fn() -> K>,
}

impl<K> fmt::Debug for KubeResourceStore<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeResourceStore")
            .field("field_manager", &self.field_manager)
            .finish_non_exhaustive()
    }
}

impl<K> KubeResourceStore<K> {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self {
        Self {
            client,
            field_manager: field_manager.into(),
            _resource: PhantomData,
        }
    }
}

#[async_trait]
impl<K> ResourceStore<K> for KubeResourceStore<K>
where
    K: ReconciledResource,
{
    async fn get(&self, key: &ObjectKey) -> Result<Option<K>, StoreError> {
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);
        api.get_opt(&key.name).await.map_err(|source| StoreError::Api {
            key: key.clone(),
            source,
        })
    }

    async fn update_status(&self, resource: &K) -> Result<K, StoreError> {
        let key = ObjectKey::from_resource(resource);
        let api: Api<K> = Api::namespaced(self.client.clone(), &key.namespace);

        let patch = serde_json::json!({
            "metadata": {
                "resourceVersion": resource.resource_version(),
            },
            "status": resource.status(),
        });

        debug!(resource = %key, "Patching status");
        match api
            .patch_status(
                &key.name,
                &status_patch_params(&self.field_manager),
                &Patch::Merge(patch),
            )
            .await
        {
            Ok(updated) => Ok(updated),
            Err(kube::Error::Api(api_err)) if api_err.code == 409 => Err(StoreError::Conflict {
                key,
                message: api_err.message,
            }),
            Err(source) => Err(StoreError::Api { key, source }),
        }
    }
}

/// Parameters for the status merge patch; plain field-manager attribution
fn status_patch_params(field_manager: &str) -> PatchParams {
    PatchParams {
        field_manager: Some(field_manager.to_string()),
        ..PatchParams::default()
    }
}
