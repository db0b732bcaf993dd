//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use super::ControllerContext;
use crate::controller::reconciler::{BackoffState, ReconcileError, WorkloadKey};
use crate::crd::Workload;
use kube::Resource;
use kube_runtime::controller::{Action, Error as ControllerError};
use kube_runtime::watcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Key used to track backoff state for one resource
pub fn backoff_key<W: Workload>(key: &WorkloadKey) -> String {
    format!("{}/{}", W::kind(&()), key)
}

/// Handle reconciliation errors
///
/// Transient errors are retried with a Fibonacci backoff tracked per resource, so
/// one failing workload never slows down the others. Fatal errors wait for the
/// workload to change.
pub fn handle_reconciliation_error<W: Workload>(
    obj: Arc<W>,
    error: &ReconcileError,
    ctx: Arc<ControllerContext>,
) -> Action {
    let key = WorkloadKey::from_resource(obj.as_ref());

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = %W::kind(&()),
        resource.name = key.name.as_str(),
        resource.namespace = key.namespace.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    if error.is_fatal() {
        error!("Reconciliation cannot succeed until the workload changes: {}", error);
        return Action::await_change();
    }

    error!("Reconciliation error for {}: {}", key, error);

    let resource_key = backoff_key::<W>(&key);
    let (backoff_seconds, error_count) = match ctx.backoff_states.lock() {
        Ok(mut states) => {
            let state = states.entry(resource_key).or_insert_with(|| {
                BackoffState::new(
                    ctx.config.backoff_min_duration(),
                    ctx.config.backoff_max_duration(),
                )
            });
            state.increment_error();
            (state.backoff.next_backoff_seconds(), state.error_count)
        }
        Err(e) => {
            warn!("Failed to lock backoff_states: {}, using maximum backoff", e);
            (ctx.config.backoff_max_secs, 0)
        }
    };

    info!(
        backoff_secs = backoff_seconds,
        error_count, "Retrying with Fibonacci backoff"
    );
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Log an error surfaced by a controller stream
///
/// Reconcile failures were already handled by [`handle_reconciliation_error`];
/// watch failures are retried by the watcher's own backoff.
pub fn handle_watch_stream_error(error: &ControllerError<ReconcileError, watcher::Error>) {
    match error {
        ControllerError::ReconcilerFailed(err, obj_ref) => {
            debug!(object = %obj_ref, error = %err, "watch.event.reconcile_failed");
        }
        ControllerError::ObjectNotFound(obj_ref) => {
            debug!(object = %obj_ref, "Object not found in cache, likely deleted");
        }
        ControllerError::QueueError(err) => {
            warn!(error = %err, "Watch stream error, watcher will retry");
        }
        other => {
            error!("Controller stream error: {}", other);
        }
    }
}
