//! # Watch Registration
//!
//! Collects the watch sources a reconciler needs before the controller starts.
//!
//! Actions declare the kinds they own during configuration; the builder keeps
//! one entry per kind and later turns the registrations into predicate-filtered
//! streams on a `kube_runtime::Controller`.

use futures::Stream;
use kube::api::Api;
use kube::core::NamespaceResourceScope;
use kube::runtime::reflector::{self, Store};
use kube::runtime::{predicates, watcher, Controller, PredicateConfig, WatchStreamExt};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt;
use tracing::debug;

use crate::crd::ReconciledResource;

/// Which changes of a watched object trigger reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPredicate {
    /// Spec changes only (`metadata.generation` bumps)
    GenerationChanged,
    /// Any stored change (`metadata.resourceVersion` bumps)
    ResourceVersionChanged,
}

impl WatchPredicate {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchPredicate::GenerationChanged => "generation",
            WatchPredicate::ResourceVersionChanged => "resourceVersion",
        }
    }
}

/// Predicate function for `WatchStreamExt::predicate_filter`
pub fn predicate_fn<T: Resource>(predicate: WatchPredicate) -> fn(&T) -> Option<u64> {
    match predicate {
        WatchPredicate::GenerationChanged => predicates::generation::<T>,
        WatchPredicate::ResourceVersionChanged => predicates::resource_version::<T>,
    }
}

/// A registered watch source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchDescriptor {
    pub api_version: String,
    pub kind: String,
    pub predicate: WatchPredicate,
}

impl WatchDescriptor {
    pub fn of<T: Resource<DynamicType = ()>>(predicate: WatchPredicate) -> Self {
        Self {
            api_version: T::api_version(&()).to_string(),
            kind: T::kind(&()).to_string(),
            predicate,
        }
    }

    fn same_kind(&self, other: &WatchDescriptor) -> bool {
        self.api_version == other.api_version && self.kind == other.kind
    }
}

impl fmt::Display for WatchDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) on {}",
            self.kind,
            self.api_version,
            self.predicate.as_str()
        )
    }
}

/// Where watches are opened: cluster-wide or a single namespace
#[derive(Clone)]
pub struct WatchScope {
    pub client: Client,
    pub namespace: Option<String>,
    pub config: watcher::Config,
}

impl fmt::Debug for WatchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchScope")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl WatchScope {
    pub fn new(client: Client, namespace: Option<String>) -> Self {
        Self {
            client,
            namespace,
            config: watcher::Config::default(),
        }
    }

    pub fn api<T>(&self) -> Api<T>
    where
        T: Resource<DynamicType = (), Scope = NamespaceResourceScope>,
    {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }
}

type OwnsInstaller<K> = Box<dyn FnOnce(Controller<K>, &WatchScope) -> Controller<K> + Send>;

/// Accumulates watch registrations for primary kind `K`
pub struct WatchBuilder<K>
where
    K: ReconciledResource,
{
    primary: Option<WatchDescriptor>,
    owned: Vec<WatchDescriptor>,
    installers: Vec<OwnsInstaller<K>>,
}

impl<K> fmt::Debug for WatchBuilder<K>
where
    K: ReconciledResource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBuilder")
            .field("primary", &self.primary)
            .field("owned", &self.owned)
            .finish()
    }
}

impl<K> Default for WatchBuilder<K>
where
    K: ReconciledResource,
{
    fn default() -> Self {
        Self {
            primary: None,
            owned: Vec::new(),
            installers: Vec::new(),
        }
    }
}

impl<K> WatchBuilder<K>
where
    K: ReconciledResource,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch the primary kind; the first registration wins
    pub fn watch_primary(&mut self, predicate: WatchPredicate) -> &mut Self {
        if self.primary.is_none() {
            self.primary = Some(WatchDescriptor::of::<K>(predicate));
        }
        self
    }

    /// Watch an owned kind, mapping its events back to the controller owner
    ///
    /// Registering a kind that is already watched is a no-op.
    pub fn owns<C>(&mut self, predicate: WatchPredicate) -> &mut Self
    where
        C: Resource<DynamicType = (), Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + fmt::Debug
            + Send
            + Sync
            + 'static,
    {
        let descriptor = WatchDescriptor::of::<C>(predicate);
        if self.owned.iter().any(|d| d.same_kind(&descriptor)) {
            debug!(watch = %descriptor, "Owned kind already watched");
            return self;
        }

        self.owned.push(descriptor);
        self.installers.push(Box::new(move |controller: Controller<K>, scope: &WatchScope| {
            let stream = watcher(scope.api::<C>(), scope.config.clone())
                .default_backoff()
                .touched_objects()
                .predicate_filter(predicate_fn::<C>(predicate), PredicateConfig::default());
            controller.owns_stream(stream)
        }));
        self
    }

    pub fn primary(&self) -> Option<&WatchDescriptor> {
        self.primary.as_ref()
    }

    pub fn owned(&self) -> &[WatchDescriptor] {
        &self.owned
    }

    /// Turn the registrations into a controller
    ///
    /// The primary kind falls back to generation changes when nothing
    /// registered it.
    pub fn build(self, scope: &WatchScope) -> Controller<K> {
        let predicate = self
            .primary
            .as_ref()
            .map_or(WatchPredicate::GenerationChanged, |d| d.predicate);

        let (reader, stream) = primary_stream::<K>(scope, predicate);
        let mut controller = Controller::for_stream(stream, reader);
        for install in self.installers {
            controller = install(controller, scope);
        }
        controller
    }
}

fn primary_stream<K>(
    scope: &WatchScope,
    predicate: WatchPredicate,
) -> (Store<K>, impl Stream<Item = Result<K, watcher::Error>> + Send + 'static)
where
    K: ReconciledResource,
{
    let (reader, writer) = reflector::store();
    let stream = watcher(scope.api::<K>(), scope.config.clone())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .predicate_filter(predicate_fn::<K>(predicate), PredicateConfig::default());
    (reader, stream)
}
