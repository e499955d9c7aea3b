//! # Type Registry
//!
//! Maps the statically-typed resources the operator knows about to the
//! `ApiResource` needed to address them dynamically, and renders the owner
//! references that tie owned objects to their owner.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::api::DynamicObject;
use kube::core::ApiResource;
use kube::Resource;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::crd::{IntegrationPlatform, Workspace};

#[derive(Debug, Error)]
pub enum SchemeError {
    #[error("kind {kind} ({api_version}) is not registered")]
    NotRegistered { api_version: String, kind: String },

    #[error("{kind} {name} has no uid yet, cannot own other resources")]
    MissingIdentity { kind: String, name: String },
}

/// Registry of known resource kinds keyed by `(apiVersion, kind)`
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    resources: BTreeMap<(String, String), ApiResource>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a statically-typed resource; registering twice is a no-op
    pub fn register<K>(&mut self) -> &mut Self
    where
        K: Resource<DynamicType = ()>,
    {
        let resource = ApiResource::erase::<K>(&());
        self.resources
            .entry((resource.api_version.clone(), resource.kind.clone()))
            .or_insert(resource);
        self
    }

    pub fn is_registered(&self, api_version: &str, kind: &str) -> bool {
        self.resources
            .contains_key(&(api_version.to_string(), kind.to_string()))
    }

    /// Look up a registered kind
    pub fn api_resource(&self, api_version: &str, kind: &str) -> Result<&ApiResource, SchemeError> {
        self.resources
            .get(&(api_version.to_string(), kind.to_string()))
            .ok_or_else(|| SchemeError::NotRegistered {
                api_version: api_version.to_string(),
                kind: kind.to_string(),
            })
    }

    pub fn resolve<K>(&self) -> Result<&ApiResource, SchemeError>
    where
        K: Resource<DynamicType = ()>,
    {
        self.api_resource(&K::api_version(&()), &K::kind(&()))
    }

    /// Controller owner reference pointing at `owner`
    ///
    /// Fails when the owner's kind is unknown or the owner has not been
    /// persisted yet (no uid).
    pub fn controller_owner_ref<K>(&self, owner: &K) -> Result<OwnerReference, SchemeError>
    where
        K: Resource<DynamicType = ()>,
    {
        self.resolve::<K>()?;
        owner
            .controller_owner_ref(&())
            .ok_or_else(|| SchemeError::MissingIdentity {
                kind: K::kind(&()).to_string(),
                name: owner.meta().name.clone().unwrap_or_default(),
            })
    }

    /// Empty dynamic object of a registered kind
    pub fn new_object<K>(&self, name: &str, namespace: &str) -> Result<DynamicObject, SchemeError>
    where
        K: Resource<DynamicType = ()>,
    {
        let resource = self.resolve::<K>()?;
        Ok(DynamicObject::new(name, resource).within(namespace))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Registry with every kind the operator reconciles or owns
pub fn operator_scheme() -> Scheme {
    let mut scheme = Scheme::new();
    scheme.register::<Workspace>().register::<IntegrationPlatform>();
    scheme
}
