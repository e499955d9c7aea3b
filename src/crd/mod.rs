//! # Custom Resource Definitions
//!
//! CRD types for the Workspace operator.
//!
//! This module contains the `Workspace` resource the operator reconciles, the
//! `IntegrationPlatform` resource it owns, and the status model shared by
//! reconciled resources.

mod integration_platform;
mod status;

pub use integration_platform::{IntegrationPlatform, IntegrationPlatformSpec};
pub use status::{
    find_condition, set_condition, sort_conditions, Condition, ConditionStatus, Phase,
    ReconciledResource, ResourceStatus,
};

use kube::CustomResource;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Workspace Custom Resource Definition
///
/// A Workspace declares an integration environment; the operator converges
/// the resources it owns (currently an `IntegrationPlatform`) and reports the
/// outcome through the status subresource.
///
/// # Example
///
/// ```yaml
/// apiVersion: sco.sco1237896.github.com/v1alpha1
/// kind: Workspace
/// metadata:
///   name: foo
///   namespace: ns
/// spec: {}
/// ```
#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Workspace",
    group = "sco.sco1237896.github.com",
    version = "v1alpha1",
    namespaced,
    status = "ResourceStatus",
    shortname = "ws",
    printcolumn = r#"{"name":"Phase", "type":"string", "jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"Reconciled", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Reconcile\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSpec {
    /// Free-form workspace settings
    /// The operator passes these through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub settings: Option<serde_json::Value>,
}

fn preserve_unknown_fields(_gen: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "nullable": true,
        "x-kubernetes-preserve-unknown-fields": true
    })
}

impl ReconciledResource for Workspace {
    fn status(&self) -> Option<&ResourceStatus> {
        self.status.as_ref()
    }

    fn status_mut(&mut self) -> &mut ResourceStatus {
        self.status.get_or_insert_with(ResourceStatus::default)
    }
}
