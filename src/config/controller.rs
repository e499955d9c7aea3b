//! # Controller Configuration
//!
//! Watch scope, parallelism and error backoff settings.

use super::value_or_default;
use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_ERROR_BACKOFF_MAX_SECS, DEFAULT_ERROR_BACKOFF_MIN_SECS,
};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Maximum number of resources reconciled in parallel
    pub concurrency: u16,
    /// Namespace to watch; `None` watches all namespaces
    pub namespace: Option<String>,
    /// First retry delay after a failed reconciliation (seconds)
    pub error_backoff_min_secs: u64,
    /// Upper bound for the retry delay (seconds)
    pub error_backoff_max_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            namespace: None,
            error_backoff_min_secs: DEFAULT_ERROR_BACKOFF_MIN_SECS,
            error_backoff_max_secs: DEFAULT_ERROR_BACKOFF_MAX_SECS,
        }
    }
}

impl ControllerConfig {
    pub(crate) fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            concurrency: value_or_default(lookup, "CONTROLLER_CONCURRENCY", DEFAULT_CONCURRENCY),
            namespace: lookup("WATCH_NAMESPACE")
                .map(|ns| ns.trim().to_string())
                .filter(|ns| !ns.is_empty()),
            error_backoff_min_secs: value_or_default(
                lookup,
                "ERROR_BACKOFF_MIN_SECS",
                DEFAULT_ERROR_BACKOFF_MIN_SECS,
            ),
            error_backoff_max_secs: value_or_default(
                lookup,
                "ERROR_BACKOFF_MAX_SECS",
                DEFAULT_ERROR_BACKOFF_MAX_SECS,
            ),
        }
    }
}
