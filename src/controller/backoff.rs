//! # Error Backoff
//!
//! Fibonacci backoff for failed reconciliations, tracked per resource so one
//! failing resource does not slow down the others.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::warn;

use crate::controller::store::ObjectKey;

/// Fibonacci sequence of delays between `min` and `max` seconds
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    max_secs: u64,
    previous: u64,
    current: u64,
}

impl FibonacciBackoff {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        let min_secs = min_secs.max(1);
        Self {
            min_secs,
            max_secs: max_secs.max(min_secs),
            previous: 0,
            current: min_secs,
        }
    }

    /// Next delay in seconds; the sequence goes min, min, 2min, 3min, 5min... capped at max
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let delay = self.current.min(self.max_secs);
        let next = if self.previous == 0 {
            self.min_secs
        } else {
            self.previous.saturating_add(self.current)
        };
        self.previous = self.current;
        self.current = next;
        delay
    }
}

#[derive(Debug)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

/// Per-resource backoff states
#[derive(Debug)]
pub struct BackoffTracker {
    min_secs: u64,
    max_secs: u64,
    states: Mutex<HashMap<ObjectKey, BackoffState>>,
}

impl BackoffTracker {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            max_secs,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Record an error for `key` and return how long to wait before retrying
    /// together with the consecutive error count
    pub fn next_delay(&self, key: &ObjectKey) -> (Duration, u32) {
        match self.states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.clone()).or_insert_with(|| BackoffState {
                    backoff: FibonacciBackoff::new(self.min_secs, self.max_secs),
                    error_count: 0,
                });
                state.error_count = state.error_count.saturating_add(1);
                (
                    Duration::from_secs(state.backoff.next_backoff_seconds()),
                    state.error_count,
                )
            }
            Err(e) => {
                warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                (Duration::from_secs(self.min_secs), 0)
            }
        }
    }

    /// Forget the error history of `key` after a successful reconciliation
    pub fn reset(&self, key: &ObjectKey) {
        match self.states.lock() {
            Ok(mut states) => {
                states.remove(key);
            }
            Err(e) => warn!("Failed to lock backoff states: {}, backoff not reset", e),
        }
    }
}
