//! # Metrics Module
//!
//! Prometheus metrics for monitoring the operator, organized by responsibility.
//!
//! ## Sub-modules
//!
//! - `registry` - Metrics registry setup, registration and text encoding
//! - `controller_metrics` - Reconciliations, errors, requeues and action failures

pub mod controller_metrics;
pub mod registry;

pub use controller_metrics::*;
pub use registry::*;
