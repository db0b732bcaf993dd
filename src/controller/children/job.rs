//! # Batch Job
//!
//! Run-to-completion Job for a `BatchJob` workload.
//!
//! A Job only reports `Complete`/`Failed` conditions once it finishes, so while it
//! runs the projection synthesizes a progressing/available style condition from
//! the active pod count.

use super::{child_condition, child_metadata, diff, pod_template, ChildObservation, ChildResource};
use crate::constants::{DEFAULT_BACKOFF_LIMIT, DEFAULT_RESTART_POLICY};
use crate::controller::reconciler::ReconcileError;
use crate::crd::BatchJob;
use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Job for a batch workload.
///
/// `backoffLimit` defaults to 1 and an unset restart policy to `Never`.
///
/// # Errors
///
/// [`ReconcileError::Fatal`] when the workload's pod template is unusable.
pub fn desired_job(batch: &BatchJob) -> Result<Job, ReconcileError> {
    let metadata = child_metadata(batch)?;
    let labels = metadata.labels.clone().unwrap_or_default();
    let mut template = pod_template(batch, &labels)?;

    if let Some(pod) = template.spec.as_mut() {
        if pod.restart_policy.as_deref().is_none_or(str::is_empty) {
            pod.restart_policy = Some(DEFAULT_RESTART_POLICY.to_string());
        }
    }

    let spec = &batch.spec.workload;
    Ok(Job {
        metadata,
        spec: Some(JobSpec {
            backoff_limit: Some(spec.backoff_limit.unwrap_or(DEFAULT_BACKOFF_LIMIT)),
            active_deadline_seconds: spec.active_deadline_seconds,
            ttl_seconds_after_finished: spec.ttl_seconds_after_finished,
            template,
            ..JobSpec::default()
        }),
        status: None,
    })
}

impl ChildResource for Job {
    fn copy_owned_fields(desired: &Self, live: &mut Self) -> bool {
        let mut changed = diff::union_labels(desired.metadata.labels.as_ref(), &mut live.metadata.labels);

        let Some(want) = desired.spec.as_ref() else {
            return changed;
        };
        let have = live.spec.get_or_insert_with(JobSpec::default);

        let want_labels = want.template.metadata.as_ref().and_then(|m| m.labels.as_ref());
        let have_meta = have.template.metadata.get_or_insert_with(ObjectMeta::default);
        changed |= diff::union_labels(want_labels, &mut have_meta.labels);

        if !diff::serialized_subset(&want.template.spec, &have.template.spec) {
            have.template.spec.clone_from(&want.template.spec);
            changed = true;
        }

        changed
    }

    fn observe(&self) -> Option<ChildObservation> {
        let status = self.status.as_ref();
        let conditions = status.and_then(|s| s.conditions.as_deref()).unwrap_or_default();

        let condition = conditions
            .iter()
            .find(|c| c.status == "True" && matches!(c.type_.as_str(), "Complete" | "Failed"))
            .or_else(|| conditions.first())
            .map(|c| child_condition(&c.type_, &c.status, c.reason.as_deref(), c.message.as_deref()))
            .unwrap_or_else(|| {
                if status.and_then(|s| s.active).unwrap_or(0) > 0 {
                    child_condition("Available", "True", Some("PodsActive"), None)
                } else {
                    child_condition("Progressing", "True", Some("JobCreated"), None)
                }
            });

        Some(ChildObservation {
            ready_replicas: status.and_then(|s| s.ready).unwrap_or(0),
            condition: Some(condition),
        })
    }
}
