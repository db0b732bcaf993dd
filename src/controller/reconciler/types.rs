//! # Types
//!
//! Core types for the reconciler.

use crate::controller::backoff::FibonacciBackoff;
use crate::controller::finalizer::CleanupHook;
use crate::store::{ObjectStore, StoreError};
use kube::ResourceExt;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Namespace and name of a workload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn from_resource<K: ResourceExt>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Store unavailable, write conflict or child write failure. Retry with backoff.
    #[error("transient store failure: {0}")]
    Transient(#[from] StoreError),
    /// The cleanup hook failed during deletion. Retry with backoff.
    #[error("cleanup of {key} failed: {source}")]
    Cleanup {
        key: WorkloadKey,
        #[source]
        source: anyhow::Error,
    },
    /// The spec cannot produce a valid child. Retrying will not help until it is edited.
    #[error("workload {key} cannot be reconciled: {reason}")]
    Fatal { key: WorkloadKey, reason: String },
}

impl ReconcileError {
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReconcileError::Fatal { .. })
    }
}

/// What the caller should do after a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Converged. Wait for the next change.
    Done,
    /// Re-invoke after the given delay.
    RequeueAfter(Duration),
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min, max),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// The reconcile engine. Holds no per-workload state; everything a pass needs is
/// read from the store or passed in.
#[derive(Clone)]
pub struct Reconciler<S> {
    pub(crate) store: S,
    pub(crate) cleanup: Arc<dyn CleanupHook>,
    pub(crate) warning_requeue: Duration,
}

impl<S> fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("warning_requeue", &self.warning_requeue)
            .finish_non_exhaustive()
    }
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S, cleanup: Arc<dyn CleanupHook>, warning_requeue: Duration) -> Self {
        Self {
            store,
            cleanup,
            warning_requeue,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
