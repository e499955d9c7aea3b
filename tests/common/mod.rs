//! In-memory collaborators for driving the reconciler without a cluster.

#![allow(dead_code, reason = "Each test binary uses a different subset of the fakes")]

use async_trait::async_trait;
use kube::api::DynamicObject;
use kube::ResourceExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use workspace_operator::controller::action::{Action, ActionError};
use workspace_operator::controller::capability::{CapabilityProber, ClusterType, ProbeError};
use workspace_operator::controller::convergence::{ConvergeError, ConvergenceClient};
use workspace_operator::controller::reconciler::ReconciliationRequest;
use workspace_operator::controller::store::{ObjectKey, ResourceStore, StoreError};
use workspace_operator::controller::watch::WatchBuilder;
use workspace_operator::crd::{
    set_condition, Condition, ConditionStatus, ReconciledResource, Workspace, WorkspaceSpec,
};

/// Workspace `namespace/name` at `generation`, as the API server would return it
pub fn workspace(namespace: &str, name: &str, generation: i64) -> Workspace {
    let mut workspace = Workspace::new(name, WorkspaceSpec::default());
    workspace.metadata.namespace = Some(namespace.to_string());
    workspace.metadata.uid = Some(format!("{namespace}-{name}-uid"));
    workspace.metadata.generation = Some(generation);
    workspace.metadata.resource_version = Some("1".to_string());
    workspace
}

/// Resource store keeping objects in a map, with optimistic concurrency on
/// status writes
#[derive(Default)]
pub struct InMemoryStore {
    objects: Mutex<HashMap<ObjectKey, Workspace>>,
    get_failure: Mutex<Option<String>>,
    write_failure: Mutex<Option<String>>,
    conflict_on_write: AtomicBool,
    status_writes: Mutex<Vec<Workspace>>,
}

impl InMemoryStore {
    pub fn with(workspaces: impl IntoIterator<Item = Workspace>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut objects = store.objects.lock().unwrap();
            for workspace in workspaces {
                objects.insert(ObjectKey::from_resource(&workspace), workspace);
            }
        }
        Arc::new(store)
    }

    pub fn fail_get(&self, message: &str) {
        *self.get_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_writes(&self, message: &str) {
        *self.write_failure.lock().unwrap() = Some(message.to_string());
    }

    /// Simulate another writer updating the object before our status write
    pub fn conflict_on_write(&self) {
        self.conflict_on_write.store(true, Ordering::SeqCst);
    }

    pub fn stored(&self, key: &ObjectKey) -> Option<Workspace> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn status_writes(&self) -> Vec<Workspace> {
        self.status_writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceStore<Workspace> for InMemoryStore {
    async fn get(&self, key: &ObjectKey) -> Result<Option<Workspace>, StoreError> {
        if let Some(message) = self.get_failure.lock().unwrap().clone() {
            return Err(StoreError::Backend {
                key: key.clone(),
                message,
            });
        }
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    async fn update_status(&self, resource: &Workspace) -> Result<Workspace, StoreError> {
        let key = ObjectKey::from_resource(resource);
        if let Some(message) = self.write_failure.lock().unwrap().clone() {
            return Err(StoreError::Backend { key, message });
        }

        let mut objects = self.objects.lock().unwrap();
        let Some(stored) = objects.get_mut(&key) else {
            return Err(StoreError::Backend {
                key,
                message: "not found".to_string(),
            });
        };

        if self.conflict_on_write.load(Ordering::SeqCst)
            || stored.resource_version() != resource.resource_version()
        {
            return Err(StoreError::Conflict {
                key,
                message: "the object has been modified; please apply your changes to the latest version and try again".to_string(),
            });
        }

        let next_version = stored
            .resource_version()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or_default()
            + 1;
        stored.status = resource.status.clone();
        stored.metadata.resource_version = Some(next_version.to_string());

        let updated = stored.clone();
        self.status_writes.lock().unwrap().push(updated.clone());
        Ok(updated)
    }
}

/// Convergence client recording applied objects, optionally failing
#[derive(Default)]
pub struct ScriptedConvergence {
    failure: Mutex<Option<String>>,
    applied: Mutex<Vec<DynamicObject>>,
}

impl ScriptedConvergence {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing(message: &str) -> Arc<Self> {
        let client = Self::default();
        *client.failure.lock().unwrap() = Some(message.to_string());
        Arc::new(client)
    }

    pub fn applied(&self) -> Vec<DynamicObject> {
        self.applied.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConvergenceClient for ScriptedConvergence {
    async fn apply_owned(&self, mut desired: DynamicObject) -> Result<DynamicObject, ConvergeError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ConvergeError::Rejected { code: 403, message });
        }
        self.applied.lock().unwrap().push(desired.clone());
        desired.metadata.uid = Some(format!("{}-applied-uid", desired.name_any()));
        Ok(desired)
    }
}

/// Prober returning a fixed answer
pub struct StaticProber(pub Result<ClusterType, String>);

#[async_trait]
impl CapabilityProber for StaticProber {
    async fn probe(&self) -> Result<ClusterType, ProbeError> {
        self.0.clone().map_err(ProbeError::Unavailable)
    }
}

/// Action recording its invocations into a shared log
pub struct RecordingAction {
    name: &'static str,
    condition_type: &'static str,
    failure: Option<String>,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingAction {
    pub fn new(
        name: &'static str,
        condition_type: &'static str,
        log: &Arc<Mutex<Vec<String>>>,
    ) -> Self {
        Self {
            name,
            condition_type,
            failure: None,
            log: Arc::clone(log),
        }
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }
}

#[async_trait]
impl Action<Workspace> for RecordingAction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn configure(&self, _watches: &mut WatchBuilder<Workspace>) -> Result<(), ActionError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("configure:{}", self.name));
        Ok(())
    }

    async fn apply(
        &self,
        request: &mut ReconciliationRequest<Workspace>,
    ) -> Result<(), ActionError> {
        self.log.lock().unwrap().push(format!(
            "apply:{}:{}:{}",
            self.name, request.key, request.cluster_type
        ));

        let generation = request.resource.metadata.generation.unwrap_or_default();
        let (status, reason, message) = match &self.failure {
            Some(message) => (ConditionStatus::False, "Failure", message.clone()),
            None => (ConditionStatus::True, "Done", "Done".to_string()),
        };
        set_condition(
            &mut request.resource.status_mut().conditions,
            Condition::new(self.condition_type, status, reason, message, generation),
        );

        match &self.failure {
            Some(message) => Err(ActionError::Converge(ConvergeError::Rejected {
                code: 500,
                message: message.clone(),
            })),
            None => Ok(()),
        }
    }

    async fn cleanup(
        &self,
        request: &mut ReconciliationRequest<Workspace>,
    ) -> Result<(), ActionError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("cleanup:{}:{}", self.name, request.key));
        Ok(())
    }
}
