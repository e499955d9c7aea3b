//! # Status Aggregation
//!
//! Builds the umbrella `Reconcile` condition and folds the pipeline result
//! into phase, observed generation and conditions.

use crate::constants::{CONDITION_TYPE_RECONCILE, REASON_FAILURE, REASON_RECONCILED};
use crate::crd::{set_condition, sort_conditions, Condition, ConditionStatus, Phase, ReconciledResource};

/// The `Reconcile` condition a pass at `generation` starts from
///
/// It stays out of the stored list until the pass is aggregated, so a
/// resource that keeps failing never sees it flip back and forth.
pub fn seed_reconcile_condition(generation: i64) -> Condition {
    Condition::new(
        CONDITION_TYPE_RECONCILE,
        ConditionStatus::True,
        REASON_RECONCILED,
        REASON_RECONCILED,
        generation,
    )
}

/// Fold the pipeline result into phase, observed generation and conditions
///
/// A failed pipeline leaves `observedGeneration` where it was.
pub fn apply_outcome<K: ReconciledResource>(
    resource: &mut K,
    generation: i64,
    mut reconcile: Condition,
    succeeded: bool,
) {
    let status = resource.status_mut();
    if succeeded {
        status.phase = Phase::Ready;
        status.observed_generation = generation;
    } else {
        status.phase = Phase::Error;
        reconcile.status = ConditionStatus::False;
        reconcile.reason = REASON_FAILURE.to_string();
        reconcile.message = REASON_FAILURE.to_string();
    }
    set_condition(&mut status.conditions, reconcile);
    sort_conditions(&mut status.conditions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Workspace, WorkspaceSpec};

    const PINNED: &str = "2020-01-01T00:00:00Z";

    fn workspace() -> Workspace {
        Workspace::new("foo", WorkspaceSpec::default())
    }

    #[test]
    fn test_success_sets_ready_and_observed_generation() {
        let mut resource = workspace();
        apply_outcome(&mut resource, 3, seed_reconcile_condition(3), true);

        let status = ReconciledResource::status(&resource).unwrap();
        assert_eq!(status.phase, Phase::Ready);
        assert_eq!(status.observed_generation, 3);
        let reconcile = status.condition("Reconcile").unwrap();
        assert!(reconcile.is_true());
        assert_eq!(reconcile.reason, "Reconciled");
    }

    #[test]
    fn test_failure_keeps_observed_generation() {
        let mut resource = workspace();
        resource.status_mut().observed_generation = 2;
        apply_outcome(&mut resource, 3, seed_reconcile_condition(3), false);

        let status = ReconciledResource::status(&resource).unwrap();
        assert_eq!(status.phase, Phase::Error);
        assert_eq!(status.observed_generation, 2);
        let reconcile = status.condition("Reconcile").unwrap();
        assert_eq!(reconcile.status, ConditionStatus::False);
        assert_eq!(reconcile.reason, "Failure");
        assert_eq!(reconcile.message, "Failure");
    }

    #[test]
    fn test_repeated_failure_keeps_transition_time() {
        let mut resource = workspace();
        let mut failed = seed_reconcile_condition(3);
        failed.status = ConditionStatus::False;
        failed.reason = "Failure".to_string();
        failed.message = "Failure".to_string();
        failed.last_transition_time = Some(PINNED.to_string());
        resource.status_mut().phase = Phase::Error;
        resource.status_mut().conditions.push(failed);
        let before = resource.status_mut().clone();

        apply_outcome(&mut resource, 3, seed_reconcile_condition(3), false);

        assert_eq!(ReconciledResource::status(&resource), Some(&before));
    }

    #[test]
    fn test_repeated_success_keeps_transition_time() {
        let mut resource = workspace();
        let mut reconciled = seed_reconcile_condition(3);
        reconciled.last_transition_time = Some(PINNED.to_string());
        resource.status_mut().phase = Phase::Ready;
        resource.status_mut().observed_generation = 3;
        resource.status_mut().conditions.push(reconciled);
        let before = resource.status_mut().clone();

        apply_outcome(&mut resource, 3, seed_reconcile_condition(3), true);

        assert_eq!(ReconciledResource::status(&resource), Some(&before));
    }

    #[test]
    fn test_outcome_sorts_conditions() {
        let mut resource = workspace();
        resource.status_mut().conditions.push(Condition::new(
            "Reconcile",
            ConditionStatus::True,
            "Reconciled",
            "Reconciled",
            1,
        ));
        resource.status_mut().conditions.push(Condition::new(
            "Deployment",
            ConditionStatus::True,
            "Deployed",
            "Deployed",
            1,
        ));
        apply_outcome(&mut resource, 1, seed_reconcile_condition(1), true);

        let types: Vec<_> = ReconciledResource::status(&resource)
            .unwrap()
            .conditions
            .iter()
            .map(|c| c.r#type.clone())
            .collect();
        assert_eq!(types, vec!["Deployment", "Reconcile"]);
    }
}
