//! # Finalizer
//!
//! Gates workload deletion behind cleanup.
//!
//! ```text
//! NoFinalizer -> HasFinalizer -> Deleting -> (cleanup, Stopped) -> Released
//! ```
//!
//! Children are removed by owner-reference cascade, so the default cleanup hook has
//! nothing to do. The hook is the place to release anything the workload uses that
//! is not owned through a reference.

use crate::constants::WORKLOAD_FINALIZER;
use crate::controller::conditions::{self, timestamp};
use crate::controller::reconciler::{ReconcileError, WorkloadKey};
use crate::crd::{ConditionStatus, ConditionType, Workload};
use crate::store::ObjectStore;
use async_trait::async_trait;
use chrono::Utc;
use kube::{Resource, ResourceExt};
use tracing::{debug, info};

/// Releases resources a workload holds outside the owner-reference graph.
#[async_trait]
pub trait CleanupHook: Send + Sync {
    /// Must be idempotent: a failed deletion pass runs it again.
    async fn cleanup(&self, kind: &str, key: &WorkloadKey) -> anyhow::Result<()>;
}

/// Cleanup that relies entirely on owner-reference cascade.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnerReferenceCascade;

#[async_trait]
impl CleanupHook for OwnerReferenceCascade {
    async fn cleanup(&self, kind: &str, key: &WorkloadKey) -> anyhow::Result<()> {
        debug!(resource.kind = kind, resource.key = %key, "Children are removed by owner-reference cascade");
        Ok(())
    }
}

/// Where a workload is in its deletion lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizerState {
    NoFinalizer,
    HasFinalizer,
    /// Deletion requested, finalizer still present.
    Deleting,
    /// Deletion requested and the finalizer already gone.
    Released,
}

impl FinalizerState {
    pub fn of<W: Workload>(obj: &W) -> Self {
        match (obj.meta().deletion_timestamp.is_some(), has_finalizer(obj)) {
            (false, false) => FinalizerState::NoFinalizer,
            (false, true) => FinalizerState::HasFinalizer,
            (true, true) => FinalizerState::Deleting,
            (true, false) => FinalizerState::Released,
        }
    }
}

#[must_use]
pub fn has_finalizer<W: Workload>(obj: &W) -> bool {
    obj.finalizers().iter().any(|f| f == WORKLOAD_FINALIZER)
}

/// Register the finalizer. A no-op returning the object unchanged when it is
/// already present.
///
/// # Errors
///
/// [`ReconcileError::Transient`] if the update fails.
pub async fn add_finalizer<S: ObjectStore, W: Workload>(
    store: &S,
    obj: &W,
) -> Result<W, ReconcileError> {
    if has_finalizer(obj) {
        return Ok(obj.clone());
    }
    let mut updated = obj.clone();
    updated.finalizers_mut().push(WORKLOAD_FINALIZER.to_string());

    let namespace = obj.namespace().unwrap_or_default();
    let stored = store.replace(&namespace, &updated).await?;
    info!(finalizer = WORKLOAD_FINALIZER, "Added finalizer");
    Ok(stored)
}

/// Drop the finalizer. A no-op when it is absent.
///
/// # Errors
///
/// [`ReconcileError::Transient`] if the update fails.
pub async fn remove_finalizer<S: ObjectStore, W: Workload>(
    store: &S,
    obj: &W,
) -> Result<(), ReconcileError> {
    if !has_finalizer(obj) {
        return Ok(());
    }
    let mut updated = obj.clone();
    updated.finalizers_mut().retain(|f| f != WORKLOAD_FINALIZER);

    let namespace = obj.namespace().unwrap_or_default();
    store.replace(&namespace, &updated).await?;
    info!(finalizer = WORKLOAD_FINALIZER, "Removed finalizer");
    Ok(())
}

/// Run cleanup for a workload marked for deletion, record `Stopped`, and release
/// the finalizer.
///
/// # Errors
///
/// - [`ReconcileError::Cleanup`] if the cleanup hook fails
/// - [`ReconcileError::Transient`] if a store write fails
pub async fn handle_deletion<S: ObjectStore, W: Workload>(
    store: &S,
    hook: &dyn CleanupHook,
    obj: &W,
) -> Result<(), ReconcileError> {
    let key = WorkloadKey::from_resource(obj);
    if !has_finalizer(obj) {
        debug!("Finalizer already released, nothing to clean up");
        return Ok(());
    }

    let kind = W::kind(&());
    hook.cleanup(&kind, &key)
        .await
        .map_err(|source| ReconcileError::Cleanup {
            key: key.clone(),
            source,
        })?;

    let mut current = obj.clone();
    let mut status = obj.workload_status().cloned().unwrap_or_default();
    let now = Utc::now();
    let (updated, changed) = conditions::upsert(
        &status.conditions,
        ConditionType::Stopped,
        ConditionStatus::True,
        "WorkloadDeleted",
        "Workload is being deleted",
        now,
    );
    if changed {
        status.conditions = updated;
        if status.completion_time.is_none() {
            status.completion_time = Some(timestamp(now));
        }
        status.last_reconcile_time = Some(timestamp(now));
        current.set_workload_status(status);
        current = store.replace_status(&key.namespace, &current).await?;
    }

    remove_finalizer(store, &current).await
}
