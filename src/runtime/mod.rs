//! # Runtime
//!
//! Wires the reconcile engine into `kube_runtime` controllers.
//!
//! - `initialization.rs` - rustls, tracing, health server and client setup
//! - `watch_loop.rs` - One controller per workload kind, restart on stream end
//! - `error_policy.rs` - Per-resource backoff and watch stream error logging

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

use crate::config::ControllerConfig;
use crate::controller::reconciler::{BackoffState, Reconciler};
use crate::store::KubeStore;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Shared context handed to every reconcile and error-policy call.
pub struct ControllerContext {
    pub reconciler: Reconciler<KubeStore>,
    /// Backoff state per resource, keyed by `Kind/namespace/name`
    pub backoff_states: Mutex<HashMap<String, BackoffState>>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for ControllerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerContext")
            .field("reconciler", &self.reconciler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ControllerContext {
    #[must_use]
    pub fn new(reconciler: Reconciler<KubeStore>, config: ControllerConfig) -> Self {
        Self {
            reconciler,
            backoff_states: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Forget the error streak of a resource after a successful pass.
    pub fn reset_backoff(&self, resource_key: &str) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(resource_key);
            }
            Err(e) => warn!("Failed to lock backoff_states: {}", e),
        }
    }
}
