//! # IntegrationPlatform
//!
//! Camel K `IntegrationPlatform` resource owned by each Workspace.
//!
//! The operator only renders metadata (labels and owner reference); the spec is
//! kept opaque so fields set by other controllers survive deserialization.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "IntegrationPlatform",
    group = "camel.apache.org",
    version = "v1",
    namespaced
)]
pub struct IntegrationPlatformSpec {
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}
