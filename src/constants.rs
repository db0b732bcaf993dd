//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Finalizer token registered on every workload before children are created
pub const WORKLOAD_FINALIZER: &str = "workloads.microscaler.io/finalizer";

/// Label carrying the owning workload's name on every child and pod
pub const INSTANCE_LABEL: &str = "workloads.microscaler.io/instance";

/// Port a notebook server listens on when its container declares none
pub const DEFAULT_NOTEBOOK_PORT: i32 = 8888;

/// Replica count of a notebook Deployment
pub const DEFAULT_NOTEBOOK_REPLICAS: i32 = 1;

/// Job `backoffLimit` when the workload leaves it unset
pub const DEFAULT_BACKOFF_LIMIT: i32 = 1;

/// Pod restart policy for run-to-completion children when unset
pub const DEFAULT_RESTART_POLICY: &str = "Never";

/// Requeue interval while a Warning condition is current (seconds)
pub const DEFAULT_WARNING_REQUEUE_SECS: u64 = 30;

/// Fibonacci backoff minimum for transient reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Fibonacci backoff maximum for transient reconcile errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Default delay before restarting the watch stream after it ends or errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default HTTP server port for health checks
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Default upper bound on reconciliations running at once, per workload kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Field manager recorded on every write
pub const DEFAULT_FIELD_MANAGER: &str = "workload-controller";

/// Default tracing filter when `LOG_LEVEL` is unset
pub const DEFAULT_LOG_LEVEL: &str = "workload_controller=info,kube=warn";
