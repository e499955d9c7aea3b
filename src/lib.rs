//! Workspace Operator Library
//!
//! This library provides the reconciliation engine for `Workspace` resources:
//! the action pipeline, status aggregation, watch registration and the
//! Kubernetes-backed collaborators it runs against.
//! Tests are included in the module files and under `tests/`.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;

// Re-export CRD types for convenience
pub use crd::*;
