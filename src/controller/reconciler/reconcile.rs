//! # Reconcile
//!
//! One convergence pass for a single workload.

use super::status::fold_observation;
use super::types::{ReconcileError, ReconcileOutcome, Reconciler, WorkloadKey};
use crate::controller::children::{ensure_children, ChildObservation, OwnsChildren, SyncOutcome};
use crate::controller::conditions::ConditionSet;
use crate::controller::finalizer::{self, FinalizerState};
use crate::store::ObjectStore;
use chrono::Utc;
use kube::Resource;
use tracing::{debug, info, Instrument};

impl<S: ObjectStore> Reconciler<S> {
    /// Converge the workload identified by `key`.
    ///
    /// 1. Fetch the workload; a missing workload is already converged
    /// 2. Deleting: run cleanup, record `Stopped`, release the finalizer
    /// 3. No finalizer yet: register it and stop; the update triggers the next pass
    /// 4. Ensure children, then project their live state
    /// 5. Fold the projection into status, writing only on change
    /// 6. Requeue while a Warning is the current condition
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Transient`] / [`ReconcileError::Cleanup`]: retry with backoff
    /// - [`ReconcileError::Fatal`]: the spec needs to change before a retry can succeed
    pub async fn reconcile<W: OwnsChildren>(
        &self,
        key: &WorkloadKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let kind = W::kind(&());
        let span = tracing::info_span!(
            "reconcile",
            resource.kind = %kind,
            resource.namespace = key.namespace.as_str(),
            resource.name = key.name.as_str(),
        );
        self.reconcile_pass::<W>(key).instrument(span).await
    }

    async fn reconcile_pass<W: OwnsChildren>(
        &self,
        key: &WorkloadKey,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(workload) = self.store.get::<W>(&key.namespace, &key.name).await? else {
            debug!("Workload not found, nothing to reconcile");
            return Ok(ReconcileOutcome::Done);
        };

        match FinalizerState::of(&workload) {
            FinalizerState::Deleting | FinalizerState::Released => {
                finalizer::handle_deletion(&self.store, self.cleanup.as_ref(), &workload).await?;
                return Ok(ReconcileOutcome::Done);
            }
            FinalizerState::NoFinalizer => {
                finalizer::add_finalizer(&self.store, &workload).await?;
                return Ok(ReconcileOutcome::Done);
            }
            FinalizerState::HasFinalizer => {}
        }

        let desired = workload.desired_children()?;
        let ensured = ensure_children(&self.store, key, desired).await?;
        let touched = ensured
            .iter()
            .filter(|c| c.outcome != SyncOutcome::Unchanged)
            .count();
        if touched > 0 {
            info!(children.touched = touched, "Children converged");
        }

        let observation = ChildObservation::project(&ensured);
        let current = workload.workload_status().cloned().unwrap_or_default();
        let (next, changed) = fold_observation(&current, &observation, Utc::now());

        if changed {
            let mut updated = workload.clone();
            updated.set_workload_status(next.clone());
            self.store.replace_status(&key.namespace, &updated).await?;
            debug!(
                condition = next.conditions.first().map(|c| c.r#type.as_str()),
                ready_replicas = next.ready_replicas,
                "Status updated"
            );
        }

        if ConditionSet::from_conditions(&next.conditions).has_warning() {
            info!(
                requeue_after_secs = self.warning_requeue.as_secs(),
                "Warning condition is current, requeueing"
            );
            return Ok(ReconcileOutcome::RequeueAfter(self.warning_requeue));
        }
        Ok(ReconcileOutcome::Done)
    }
}
