//! # Reconciled Resource Status
//!
//! Status types shared by every resource the reconciler manages, and the
//! merge rules for their condition lists.

use kube::core::NamespaceResourceScope;
use kube::Resource;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Overall reconciliation phase
///
/// Serialized as `""` until the first reconciliation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
pub enum Phase {
    /// Not reconciled yet
    #[default]
    #[serde(rename = "")]
    Pending,
    /// Every action converged
    Ready,
    /// At least one action failed
    Error,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Pending => "",
            Phase::Ready => "Ready",
            Phase::Error => "Error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tri-state condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

/// Condition represents one concern's latest observed outcome
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, unique within a condition list
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Machine-readable reason for the last transition
    pub reason: String,
    /// Human-readable message
    #[serde(default)]
    pub message: String,
    /// Generation of the resource this condition was computed from
    #[serde(default)]
    pub observed_generation: i64,
    /// Last time the status changed (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    pub fn new(
        r#type: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
        observed_generation: i64,
    ) -> Self {
        Self {
            r#type: r#type.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            observed_generation,
            last_transition_time: None,
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Status block of a reconciled resource
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    /// Current phase: "", Ready or Error
    #[serde(default)]
    pub phase: Phase,
    /// Generation the last successful reconciliation converged
    #[serde(default)]
    pub observed_generation: i64,
    /// Conditions, one per concern, sorted by type
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ResourceStatus {
    pub fn condition(&self, r#type: &str) -> Option<&Condition> {
        find_condition(&self.conditions, r#type)
    }
}

/// A namespaced custom resource whose status the reconciler owns
///
/// The engine never looks at the spec; it only needs identity metadata and
/// mutable access to the status block.
pub trait ReconciledResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    fn status(&self) -> Option<&ResourceStatus>;

    /// Status block, created empty if the resource has none yet
    fn status_mut(&mut self) -> &mut ResourceStatus;
}

/// Look up a condition by type
pub fn find_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}

/// Merge a condition into the list
///
/// An existing condition of the same type is overwritten in place; a new type
/// is appended. The transition time moves when status, reason or message
/// change, so an identical write leaves the list untouched.
pub fn set_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    let Some(index) = conditions
        .iter()
        .position(|c| c.r#type == condition.r#type)
    else {
        if condition.last_transition_time.is_none() {
            condition.last_transition_time = Some(now_rfc3339());
        }
        conditions.push(condition);
        return;
    };

    let existing = &mut conditions[index];
    if existing.status != condition.status
        || existing.reason != condition.reason
        || existing.message != condition.message
    {
        existing.status = condition.status;
        existing.last_transition_time = condition
            .last_transition_time
            .take()
            .or_else(|| Some(now_rfc3339()));
    }
    existing.reason = condition.reason;
    existing.message = condition.message;
    existing.observed_generation = condition.observed_generation;
}

/// Sort conditions by type so repeated reconciliations persist identical lists
pub fn sort_conditions(conditions: &mut [Condition]) {
    conditions.sort_by(|a, b| a.r#type.cmp(&b.r#type));
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(r#type: &str, status: ConditionStatus, reason: &str) -> Condition {
        Condition::new(r#type, status, reason, reason, 1)
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Reconcile", ConditionStatus::True, "Reconciled"));
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, "Reconcile");
        assert_eq!(conditions[1].r#type, "Deployment");
        assert!(conditions.iter().all(|c| c.last_transition_time.is_some()));
    }

    #[test]
    fn test_set_condition_replaces_in_place() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Reconcile", ConditionStatus::True, "Reconciled"));
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));
        set_condition(&mut conditions, condition("Reconcile", ConditionStatus::False, "Failure"));

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].r#type, "Reconcile");
        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].reason, "Failure");
    }

    #[test]
    fn test_set_condition_identical_write_is_noop() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));
        conditions[0].last_transition_time = Some("2024-01-01T00:00:00Z".to_string());
        let before = conditions.clone();

        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));

        assert_eq!(conditions, before);
    }

    #[test]
    fn test_set_condition_message_change_refreshes_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::False, "Failure"));
        conditions[0].last_transition_time = Some("2024-01-01T00:00:00Z".to_string());

        let mut updated = condition("Deployment", ConditionStatus::False, "Failure");
        updated.message = "quota exceeded".to_string();
        set_condition(&mut conditions, updated);

        assert_eq!(conditions[0].message, "quota exceeded");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_set_condition_reason_change_refreshes_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::False, "Failure"));
        conditions[0].last_transition_time = Some("2024-01-01T00:00:00Z".to_string());

        let mut updated = condition("Deployment", ConditionStatus::False, "Timeout");
        updated.message = "Failure".to_string();
        set_condition(&mut conditions, updated);

        assert_eq!(conditions[0].reason, "Timeout");
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_set_condition_status_flip_refreshes_transition_time() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::False, "Failure"));
        conditions[0].last_transition_time = Some("2024-01-01T00:00:00Z".to_string());

        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));

        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_set_condition_updates_observed_generation_without_transition() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, condition("Deployment", ConditionStatus::True, "Deployed"));
        conditions[0].last_transition_time = Some("2024-01-01T00:00:00Z".to_string());

        let mut next = condition("Deployment", ConditionStatus::True, "Deployed");
        next.observed_generation = 7;
        set_condition(&mut conditions, next);

        assert_eq!(conditions[0].observed_generation, 7);
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_sort_conditions_by_type() {
        let mut conditions = vec![
            condition("Reconcile", ConditionStatus::True, "Reconciled"),
            condition("Deployment", ConditionStatus::True, "Deployed"),
            condition("Build", ConditionStatus::Unknown, "Pending"),
        ];
        sort_conditions(&mut conditions);

        let types: Vec<_> = conditions.iter().map(|c| c.r#type.as_str()).collect();
        assert_eq!(types, vec!["Build", "Deployment", "Reconcile"]);
    }

    #[test]
    fn test_phase_serializes_pending_as_empty_string() {
        let status = ResourceStatus::default();
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["phase"], "");
        assert_eq!(json["observedGeneration"], 0);

        let ready: ResourceStatus =
            serde_json::from_value(serde_json::json!({"phase": "Ready"})).unwrap();
        assert_eq!(ready.phase, Phase::Ready);
    }

    #[test]
    fn test_condition_wire_format() {
        let condition = Condition::new(
            "Deployment",
            ConditionStatus::False,
            "Failure",
            "quota exceeded",
            3,
        );
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "Deployment");
        assert_eq!(json["status"], "False");
        assert_eq!(json["observedGeneration"], 3);
        assert!(json.get("lastTransitionTime").is_none());
    }
}
