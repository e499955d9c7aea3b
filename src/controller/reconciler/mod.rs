//! # Reconciler
//!
//! Runs the action pipeline for one resource and persists the aggregated
//! status.
//!
//! ## Pipeline
//!
//! 1. Fetch the resource; a missing resource finishes successfully
//! 2. Seed the `Reconcile` condition for the current generation
//! 3. Apply every action in registration order, collecting failures
//! 4. Fold the failures into phase and the `Reconcile` condition
//! 5. Persist the status; a write conflict requeues without an error
//!
//! The reconciler never sleeps or retries; scheduling belongs to the
//! controller runtime driving it.

mod error;
mod status;
mod types;

pub use error::{AggregateError, PipelineError, ReconcilerError};
pub use status::{apply_outcome, seed_reconcile_condition};
pub use types::{ReconcileOutcome, ReconciliationRequest};

use kube::Resource;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::controller::action::Action;
use crate::controller::capability::{CapabilityProber, ClusterType};
use crate::controller::convergence::ConvergenceClient;
use crate::controller::scheme::Scheme;
use crate::controller::store::{ObjectKey, ResourceStore};
use crate::controller::watch::{WatchBuilder, WatchPredicate};
use crate::crd::ReconciledResource;
use crate::observability;

pub struct Reconciler<K>
where
    K: ReconciledResource,
{
    store: Arc<dyn ResourceStore<K>>,
    convergence: Arc<dyn ConvergenceClient>,
    scheme: Arc<Scheme>,
    cluster_type: ClusterType,
    actions: Vec<Arc<dyn Action<K>>>,
}

impl<K> fmt::Debug for Reconciler<K>
where
    K: ReconciledResource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let actions: Vec<&str> = self.actions.iter().map(|a| a.name()).collect();
        f.debug_struct("Reconciler")
            .field("cluster_type", &self.cluster_type)
            .field("actions", &actions)
            .finish_non_exhaustive()
    }
}

impl<K> Reconciler<K>
where
    K: ReconciledResource,
{
    /// Create a reconciler, probing the cluster flavor once
    ///
    /// A failed probe aborts construction.
    pub async fn new(
        store: Arc<dyn ResourceStore<K>>,
        convergence: Arc<dyn ConvergenceClient>,
        scheme: Arc<Scheme>,
        prober: &dyn CapabilityProber,
    ) -> Result<Self, ReconcilerError> {
        let cluster_type = prober.probe().await?;
        info!(cluster_type = %cluster_type, kind = %K::kind(&()), "Detected cluster type");

        Ok(Self {
            store,
            convergence,
            scheme,
            cluster_type,
            actions: Vec::new(),
        })
    }

    /// Append an action; actions run in the order they were added
    pub fn with_action(mut self, action: impl Action<K> + 'static) -> Self {
        self.actions.push(Arc::new(action));
        self
    }

    pub fn cluster_type(&self) -> ClusterType {
        self.cluster_type
    }

    pub fn scheme(&self) -> &Arc<Scheme> {
        &self.scheme
    }

    pub fn action_names(&self) -> Vec<&'static str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Register the primary watch and every action's watches
    pub fn configure(&self, watches: &mut WatchBuilder<K>) -> Result<(), ReconcilerError> {
        watches.watch_primary(WatchPredicate::GenerationChanged);
        for action in &self.actions {
            action
                .configure(watches)
                .map_err(|source| ReconcilerError::Configure {
                    action: action.name(),
                    source,
                })?;
        }
        Ok(())
    }

    fn request(&self, key: &ObjectKey, cancel: CancellationToken, resource: K) -> ReconciliationRequest<K> {
        ReconciliationRequest {
            client: Arc::clone(&self.convergence),
            key: key.clone(),
            cluster_type: self.cluster_type,
            scheme: Arc::clone(&self.scheme),
            cancel,
            resource,
        }
    }

    async fn fetch(&self, key: &ObjectKey) -> Result<Option<K>, ReconcilerError> {
        self.store
            .get(key)
            .await
            .map_err(|source| ReconcilerError::Fetch {
                key: key.clone(),
                source,
            })
    }

    /// Reconcile the resource identified by `key`
    pub async fn reconcile(
        &self,
        key: &ObjectKey,
        cancel: CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let Some(resource) = self.fetch(key).await? else {
            debug!(resource = %key, "Resource not found, nothing to reconcile");
            return Ok(ReconcileOutcome::Done);
        };

        let generation = resource.meta().generation.unwrap_or_default();
        let mut request = self.request(key, cancel, resource);
        let reconcile = seed_reconcile_condition(generation);

        let mut errors = AggregateError::new();
        for action in &self.actions {
            if let Err(source) = action.apply(&mut request).await {
                error!(
                    resource = %key,
                    action = action.name(),
                    error = %source,
                    "Action failed"
                );
                observability::metrics::increment_action_failures(action.name());
                errors.push(PipelineError::Action {
                    action: action.name(),
                    source,
                });
            }
        }

        apply_outcome(&mut request.resource, generation, reconcile, errors.is_empty());

        match self.store.update_status(&request.resource).await {
            Ok(_) => {
                debug!(resource = %key, generation, "Status persisted");
            }
            Err(err) if err.is_conflict() => {
                info!(resource = %key, error = %err, "Status write conflicted, requeueing");
                return Ok(ReconcileOutcome::Requeue);
            }
            Err(err) => errors.push(PipelineError::Persist(err)),
        }

        errors
            .into_result()
            .map(|()| ReconcileOutcome::Done)
            .map_err(ReconcilerError::Pipeline)
    }

    /// Run every action's cleanup hook for the resource identified by `key`
    ///
    /// Cleanup covers effects owner references do not; a missing resource
    /// has nothing to clean up.
    pub async fn cleanup(
        &self,
        key: &ObjectKey,
        cancel: CancellationToken,
    ) -> Result<(), ReconcilerError> {
        let Some(resource) = self.fetch(key).await? else {
            debug!(resource = %key, "Resource not found, nothing to clean up");
            return Ok(());
        };

        let mut request = self.request(key, cancel, resource);
        let mut errors = AggregateError::new();
        for action in &self.actions {
            if let Err(source) = action.cleanup(&mut request).await {
                error!(
                    resource = %key,
                    action = action.name(),
                    error = %source,
                    "Cleanup failed"
                );
                errors.push(PipelineError::Cleanup {
                    action: action.name(),
                    source,
                });
            }
        }

        errors.into_result().map_err(ReconcilerError::Pipeline)
    }
}
