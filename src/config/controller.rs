//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_BACKOFF_MAX_SECS, DEFAULT_BACKOFF_MIN_SECS, DEFAULT_FIELD_MANAGER, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_HEALTH_PORT, DEFAULT_WARNING_REQUEUE_SECS,
    DEFAULT_WATCH_RESTART_DELAY_SECS,
};
use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Requeue interval while a Warning condition is current (seconds)
    pub warning_requeue_secs: u64,
    /// Fibonacci backoff minimum for transient errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff maximum for transient errors (seconds)
    pub backoff_max_secs: u64,
    /// Delay before restarting the watch stream after it ends (seconds)
    pub watch_restart_delay_secs: u64,
    /// Port of the health server
    pub health_port: u16,
    /// Maximum concurrent reconciliations per workload kind
    pub max_concurrent_reconciliations: u16,
    /// Namespace to watch. `None` watches every namespace.
    pub watch_namespace: Option<String>,
    /// Field manager recorded on writes
    pub field_manager: String,
    /// Tracing filter directive (e.g. `info`, `workload_controller=debug`)
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            warning_requeue_secs: DEFAULT_WARNING_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            health_port: DEFAULT_HEALTH_PORT,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            watch_namespace: None,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source, falling back to defaults for
    /// missing or unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            warning_requeue_secs: var_or_default(
                &lookup,
                "WARNING_REQUEUE_SECS",
                defaults.warning_requeue_secs,
            ),
            backoff_min_secs: var_or_default(&lookup, "BACKOFF_MIN_SECS", defaults.backoff_min_secs),
            backoff_max_secs: var_or_default(&lookup, "BACKOFF_MAX_SECS", defaults.backoff_max_secs),
            watch_restart_delay_secs: var_or_default(
                &lookup,
                "WATCH_RESTART_DELAY_SECS",
                defaults.watch_restart_delay_secs,
            ),
            health_port: var_or_default(&lookup, "HEALTH_PORT", defaults.health_port),
            max_concurrent_reconciliations: var_or_default(
                &lookup,
                "MAX_CONCURRENT_RECONCILIATIONS",
                defaults.max_concurrent_reconciliations,
            ),
            watch_namespace: lookup("WATCH_NAMESPACE").filter(|ns| !ns.trim().is_empty()),
            field_manager: var_or_default_str(&lookup, "FIELD_MANAGER", &defaults.field_manager),
            log_level: var_or_default_str(&lookup, "LOG_LEVEL", &defaults.log_level),
            log_format: var_or_default_str(&lookup, "LOG_FORMAT", &defaults.log_format),
        }
    }

    /// Get warning requeue duration
    #[must_use]
    pub fn warning_requeue_duration(&self) -> Duration {
        Duration::from_secs(self.warning_requeue_secs)
    }

    /// Get backoff minimum duration
    #[must_use]
    pub fn backoff_min_duration(&self) -> Duration {
        Duration::from_secs(self.backoff_min_secs)
    }

    /// Get backoff maximum duration
    #[must_use]
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_secs(self.backoff_max_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    #[must_use]
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Read a variable or return the default value
fn var_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Read a variable as string or return the default
fn var_or_default_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
