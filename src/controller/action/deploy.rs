//! # Deploy Action
//!
//! Applies the `IntegrationPlatform` owned by a reconciled resource and
//! reports the result as the `Deployment` condition.

use async_trait::async_trait;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::info;

use super::{Action, ActionError};
use crate::constants::{
    APPLICATION_NAME, CONDITION_TYPE_DEPLOYMENT, KUBERNETES_LABEL_APP_MANAGED_BY,
    KUBERNETES_LABEL_APP_NAME, KUBERNETES_LABEL_APP_PART_OF, OPERATOR_NAME, REASON_DEPLOYED,
    REASON_FAILURE,
};
use crate::controller::reconciler::ReconciliationRequest;
use crate::controller::watch::{WatchBuilder, WatchPredicate};
use crate::crd::{set_condition, Condition, ConditionStatus, IntegrationPlatform, ReconciledResource};

#[derive(Debug, Clone, Copy, Default)]
pub struct DeployAction;

impl DeployAction {
    pub fn new() -> Self {
        Self
    }

    async fn deploy<K>(&self, request: &ReconciliationRequest<K>) -> Result<(), ActionError>
    where
        K: ReconciledResource,
    {
        let owner = request.scheme.controller_owner_ref(&request.resource)?;
        let mut desired = request
            .scheme
            .new_object::<IntegrationPlatform>(&request.key.name, &request.key.namespace)?;
        desired.metadata.owner_references = Some(vec![owner]);
        desired.metadata.labels = Some(labels(&request.key.name));

        let applied = tokio::select! {
            biased;
            () = request.cancel.cancelled() => {
                return Err(ActionError::Cancelled(request.key.clone()));
            }
            result = request.client.apply_owned(desired) => result?,
        };

        info!(
            resource = %request.key,
            uid = applied.uid().as_deref().unwrap_or_default(),
            "IntegrationPlatform applied"
        );
        Ok(())
    }
}

fn labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (KUBERNETES_LABEL_APP_NAME.to_string(), name.to_string()),
        (
            KUBERNETES_LABEL_APP_PART_OF.to_string(),
            APPLICATION_NAME.to_string(),
        ),
        (
            KUBERNETES_LABEL_APP_MANAGED_BY.to_string(),
            OPERATOR_NAME.to_string(),
        ),
    ])
}

#[async_trait]
impl<K> Action<K> for DeployAction
where
    K: ReconciledResource,
{
    fn name(&self) -> &'static str {
        "deploy"
    }

    fn configure(&self, watches: &mut WatchBuilder<K>) -> Result<(), ActionError> {
        watches.owns::<IntegrationPlatform>(WatchPredicate::ResourceVersionChanged);
        Ok(())
    }

    async fn apply(&self, request: &mut ReconciliationRequest<K>) -> Result<(), ActionError> {
        let result = self.deploy(request).await;

        let generation = request.resource.meta().generation.unwrap_or_default();
        let condition = match &result {
            Ok(()) => Condition::new(
                CONDITION_TYPE_DEPLOYMENT,
                ConditionStatus::True,
                REASON_DEPLOYED,
                REASON_DEPLOYED,
                generation,
            ),
            Err(err) => Condition::new(
                CONDITION_TYPE_DEPLOYMENT,
                ConditionStatus::False,
                REASON_FAILURE,
                err.to_string(),
                generation,
            ),
        };
        set_condition(&mut request.resource.status_mut().conditions, condition);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::capability::ClusterType;
    use crate::controller::convergence::{ConvergeError, ConvergenceClient};
    use crate::controller::scheme::operator_scheme;
    use crate::controller::store::ObjectKey;
    use crate::crd::{Workspace, WorkspaceSpec};
    use kube::api::DynamicObject;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct FakeConvergence {
        failure: Option<String>,
        applied: Mutex<Vec<DynamicObject>>,
    }

    #[async_trait]
    impl ConvergenceClient for FakeConvergence {
        async fn apply_owned(
            &self,
            mut desired: DynamicObject,
        ) -> Result<DynamicObject, ConvergeError> {
            if let Some(message) = &self.failure {
                return Err(ConvergeError::Rejected {
                    code: 403,
                    message: message.clone(),
                });
            }
            self.applied.lock().unwrap().push(desired.clone());
            desired.metadata.uid = Some("ip-uid".to_string());
            Ok(desired)
        }
    }

    fn request(client: Arc<FakeConvergence>) -> ReconciliationRequest<Workspace> {
        let mut workspace = Workspace::new("foo", WorkspaceSpec::default());
        workspace.metadata.namespace = Some("ns".to_string());
        workspace.metadata.uid = Some("ws-uid".to_string());
        workspace.metadata.generation = Some(3);

        ReconciliationRequest {
            client,
            key: ObjectKey::new("ns", "foo"),
            cluster_type: ClusterType::Vanilla,
            scheme: Arc::new(operator_scheme()),
            cancel: CancellationToken::new(),
            resource: workspace,
        }
    }

    #[tokio::test]
    async fn test_apply_success_sets_deployed_condition() {
        let client = Arc::new(FakeConvergence::default());
        let mut request = request(client.clone());

        DeployAction::new().apply(&mut request).await.unwrap();

        let status = ReconciledResource::status(&request.resource).unwrap();
        let condition = status.condition("Deployment").unwrap();
        assert_eq!(condition.status, ConditionStatus::True);
        assert_eq!(condition.reason, "Deployed");
        assert_eq!(condition.observed_generation, 3);

        let applied = client.applied.lock().unwrap();
        assert_eq!(applied.len(), 1);
        let labels = applied[0].metadata.labels.as_ref().unwrap();
        assert_eq!(labels["app.kubernetes.io/name"], "foo");
        assert_eq!(labels["app.kubernetes.io/part-of"], "sco");
        assert_eq!(labels["app.kubernetes.io/managed-by"], "sco-operator");
        let owners = applied[0].metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners[0].uid, "ws-uid");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_apply_failure_records_error_message() {
        let client = Arc::new(FakeConvergence {
            failure: Some("quota exceeded".to_string()),
            ..Default::default()
        });
        let mut request = request(client);

        let err = DeployAction::new().apply(&mut request).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");

        let status = ReconciledResource::status(&request.resource).unwrap();
        let condition = status.condition("Deployment").unwrap();
        assert_eq!(condition.status, ConditionStatus::False);
        assert_eq!(condition.reason, "Failure");
        assert_eq!(condition.message, "quota exceeded");
    }

    #[tokio::test]
    async fn test_apply_cancelled_before_convergence() {
        let client = Arc::new(FakeConvergence::default());
        let mut request = request(client.clone());
        request.cancel.cancel();

        let err = DeployAction::new().apply(&mut request).await.unwrap_err();
        assert!(matches!(err, ActionError::Cancelled(_)));
        assert!(client.applied.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_apply_without_uid_fails() {
        let client = Arc::new(FakeConvergence::default());
        let mut request = request(client);
        request.resource.metadata.uid = None;

        let err = DeployAction::new().apply(&mut request).await.unwrap_err();
        assert!(matches!(err, ActionError::Scheme(_)));
    }

    #[test]
    fn test_configure_owns_integration_platform() {
        let mut watches = WatchBuilder::<Workspace>::new();
        Action::<Workspace>::configure(&DeployAction::new(), &mut watches).unwrap();

        assert_eq!(watches.owned().len(), 1);
        assert_eq!(watches.owned()[0].kind, "IntegrationPlatform");
        assert_eq!(
            watches.owned()[0].predicate,
            WatchPredicate::ResourceVersionChanged
        );
    }
}
