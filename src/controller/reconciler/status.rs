//! # Status Fold
//!
//! Folds a child observation into the workload status.

use crate::controller::children::ChildObservation;
use crate::controller::conditions::{completion_signal, derive_from_child, timestamp, ConditionSet};
use crate::crd::WorkloadStatus;
use chrono::{DateTime, Utc};

/// Compute the next status from the current one and the latest child observation.
///
/// Conditions are only touched when the child condition differs from the snapshot
/// recorded by the previous fold. Completion signals take precedence; once a
/// terminal condition is current, progressing/available signals are ignored.
/// `lastReconcileTime` is stamped only when something else changed, so a converged
/// workload produces no status write.
///
/// Returns the next status and whether it differs from `current`.
#[must_use]
pub fn fold_observation(
    current: &WorkloadStatus,
    observation: &ChildObservation,
    now: DateTime<Utc>,
) -> (WorkloadStatus, bool) {
    let mut next = current.clone();

    if next.start_time.is_none() {
        next.start_time = Some(timestamp(now));
    }
    next.ready_replicas = observation.ready_replicas;

    if let Some(child) = observation.condition.as_ref() {
        if next.child_condition.as_ref() != Some(child) {
            let mut conditions = ConditionSet::from_conditions(&next.conditions);

            if let Some(done) = completion_signal(child) {
                conditions.upsert(done.r#type, done.status, &done.reason, &done.message, now);
                if next.completion_time.is_none() {
                    next.completion_time = Some(timestamp(now));
                }
            } else if !conditions.is_finished() {
                if let Some(derived) = derive_from_child(child) {
                    conditions.upsert(
                        derived.r#type,
                        derived.status,
                        &derived.reason,
                        &derived.message,
                        now,
                    );
                }
            }

            next.conditions = conditions.into_vec();
            next.child_condition = Some(child.clone());
        }
    }

    let changed = next != *current;
    if changed {
        next.last_reconcile_time = Some(timestamp(now));
    }
    (next, changed)
}
