//! # Observability
//!
//! Prometheus metrics for the operator. Logging goes through `tracing`.

pub mod metrics;
