//! # Constants
//!
//! Shared names and defaults for the Workspace operator.

/// Name the operator identifies itself with (field manager, managed-by label)
pub const OPERATOR_NAME: &str = "sco-operator";

/// Application the managed resources belong to (part-of label)
pub const APPLICATION_NAME: &str = "sco";

/// Field manager used for server-side apply and status writes
pub const FIELD_MANAGER: &str = OPERATOR_NAME;

// Standard Kubernetes recommended labels
pub const KUBERNETES_LABEL_APP_NAME: &str = "app.kubernetes.io/name";
pub const KUBERNETES_LABEL_APP_PART_OF: &str = "app.kubernetes.io/part-of";
pub const KUBERNETES_LABEL_APP_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

// Condition types
pub const CONDITION_TYPE_RECONCILE: &str = "Reconcile";
pub const CONDITION_TYPE_DEPLOYMENT: &str = "Deployment";

// Condition reasons
pub const REASON_RECONCILED: &str = "Reconciled";
pub const REASON_DEPLOYED: &str = "Deployed";
pub const REASON_FAILURE: &str = "Failure";

/// API group whose presence marks an OpenShift-flavored cluster
pub const OPENSHIFT_API_GROUP: &str = "route.openshift.io";

/// Default port for the metrics and health probe server
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default number of resources reconciled in parallel
pub const DEFAULT_CONCURRENCY: u16 = 4;

/// Default HTTP server startup timeout in seconds
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval in milliseconds
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default minimum delay before retrying a failed reconciliation (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Default maximum delay before retrying a failed reconciliation (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;
