//! # Operator Configuration
//!
//! Configuration loaded from environment variables (populated from a ConfigMap
//! via `envFrom` in the deployment). Every setting has a default; command-line
//! flags of the `run` subcommand take precedence over the environment.

mod controller;
mod server;

pub use controller::ControllerConfig;
pub use server::ServerConfig;

/// Complete operator configuration
#[derive(Debug, Clone, Default)]
pub struct OperatorConfig {
    pub controller: ControllerConfig,
    pub server: ServerConfig,
}

impl OperatorConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            controller: ControllerConfig::from_lookup(&lookup),
            server: ServerConfig::from_lookup(&lookup),
        }
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(
        mut self,
        metrics_port: Option<u16>,
        concurrency: Option<u16>,
        namespace: Option<String>,
    ) -> Self {
        if let Some(port) = metrics_port {
            self.server.metrics_port = port;
        }
        if let Some(concurrency) = concurrency {
            self.controller.concurrency = concurrency;
        }
        if namespace.is_some() {
            self.controller.namespace = namespace;
        }
        self
    }
}

/// Parse `key` from `lookup` or fall back to `default`
pub(crate) fn value_or_default<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
