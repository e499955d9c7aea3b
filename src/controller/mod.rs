//! # Controller
//!
//! The reconciliation engine and its collaborators.
//!
//! - `reconciler` - action pipeline and status aggregation
//! - `action` - units of reconciliation work (`DeployAction`)
//! - `watch` - watch registration for the controller runtime
//! - `store` / `convergence` - Kubernetes-backed reads, status writes and server-side apply
//! - `capability` - one-time cluster flavor detection
//! - `scheme` - registry of known resource kinds
//! - `backoff` - per-resource error backoff
//! - `server` - metrics and probe endpoints

pub mod action;
pub mod backoff;
pub mod capability;
pub mod convergence;
pub mod reconciler;
pub mod scheme;
pub mod server;
pub mod store;
pub mod watch;
pub mod workspace;
