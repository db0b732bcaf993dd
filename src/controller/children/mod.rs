//! # Child Resources
//!
//! Generates the child resources a workload runs on and converges them against
//! the live objects in the store.
//!
//! Synchronization is two-phase:
//!
//! 1. **Ensure** - each desired child is created, updated on owned-field drift, or
//!    left alone ([`ensure_children`])
//! 2. **Project** - the live objects returned by phase 1 are reduced to the minimal
//!    observation the condition tracker consumes ([`ChildObservation::project`])
//!
//! Only owned fields are compared or written. Everything else on a live child
//! (defaults, platform-managed metadata, status) belongs to the platform.

pub mod deployment;
pub mod diff;
pub mod job;
pub mod service;

use crate::constants::INSTANCE_LABEL;
use crate::controller::reconciler::{ReconcileError, WorkloadKey};
use crate::crd::{BatchJob, ChildCondition, Notebook, Workload};
use crate::store::{ObjectStore, StoreError, StoreObject};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{PodTemplateSpec, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Result of converging a single child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Created,
    Updated,
    Unchanged,
}

/// A child kind the synchronizer knows how to converge.
pub trait ChildResource: StoreObject {
    /// Copy the owned fields of `desired` onto `live`.
    ///
    /// Returns true when `live` changed and needs to be written back.
    fn copy_owned_fields(desired: &Self, live: &mut Self) -> bool;

    /// Status projection fed to the condition tracker. `None` for children that
    /// carry no lifecycle signal.
    fn observe(&self) -> Option<ChildObservation> {
        None
    }
}

/// Any child object, desired or live.
#[derive(Debug, Clone)]
pub enum ChildObject {
    Deployment(Deployment),
    Service(Service),
    Job(Job),
}

impl ChildObject {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ChildObject::Deployment(_) => "Deployment",
            ChildObject::Service(_) => "Service",
            ChildObject::Job(_) => "Job",
        }
    }

    fn observe(&self) -> Option<ChildObservation> {
        match self {
            ChildObject::Deployment(d) => d.observe(),
            ChildObject::Service(s) => s.observe(),
            ChildObject::Job(j) => j.observe(),
        }
    }
}

/// A child after the ensure phase: what happened and the live object.
#[derive(Debug, Clone)]
pub struct EnsuredChild {
    pub outcome: SyncOutcome,
    pub object: ChildObject,
}

/// Minimal live-status projection of the primary child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildObservation {
    pub ready_replicas: i32,
    pub condition: Option<ChildCondition>,
}

impl ChildObservation {
    /// Reduce the ensured children to one observation. The first child carrying a
    /// lifecycle signal wins.
    #[must_use]
    pub fn project(children: &[EnsuredChild]) -> Self {
        children
            .iter()
            .find_map(|child| child.object.observe())
            .unwrap_or_default()
    }
}

/// Workload kinds that can derive their child resources.
pub trait OwnsChildren: Workload {
    /// Desired children, primary child first.
    ///
    /// # Errors
    ///
    /// [`ReconcileError::Fatal`] when the spec cannot produce a valid child.
    fn desired_children(&self) -> Result<Vec<ChildObject>, ReconcileError>;
}

impl OwnsChildren for Notebook {
    fn desired_children(&self) -> Result<Vec<ChildObject>, ReconcileError> {
        Ok(vec![
            ChildObject::Deployment(deployment::desired_deployment(self)?),
            ChildObject::Service(service::desired_service(self)?),
        ])
    }
}

impl OwnsChildren for BatchJob {
    fn desired_children(&self) -> Result<Vec<ChildObject>, ReconcileError> {
        Ok(vec![ChildObject::Job(job::desired_job(self)?)])
    }
}

/// Converge one child against the store.
///
/// Missing children are created exactly as desired. Existing children are only
/// written when an owned field drifted.
///
/// # Errors
///
/// - [`ReconcileError::Fatal`] if `desired` carries no controller owner reference, or
///   the API server rejects the write as invalid
/// - [`ReconcileError::Transient`] for any other store failure
pub async fn ensure_child<S, K>(
    store: &S,
    owner: &WorkloadKey,
    desired: K,
) -> Result<(SyncOutcome, K), ReconcileError>
where
    S: ObjectStore,
    K: ChildResource,
{
    let has_controller = desired
        .owner_references()
        .iter()
        .any(|r| r.controller == Some(true));
    if !has_controller {
        return Err(ReconcileError::Fatal {
            key: owner.clone(),
            reason: format!(
                "{} {} has no controller owner reference",
                K::kind(&()),
                desired.name_any()
            ),
        });
    }

    let namespace = desired.namespace().unwrap_or_else(|| owner.namespace.clone());
    let name = desired.name_any();

    match store.get::<K>(&namespace, &name).await? {
        None => {
            let created = store
                .create(&namespace, &desired)
                .await
                .map_err(|e| write_error(owner, e))?;
            info!(
                child.kind = %K::kind(&()),
                child.name = %name,
                "Created child resource"
            );
            Ok((SyncOutcome::Created, created))
        }
        Some(mut live) => {
            if K::copy_owned_fields(&desired, &mut live) {
                let updated = store
                    .replace(&namespace, &live)
                    .await
                    .map_err(|e| write_error(owner, e))?;
                info!(
                    child.kind = %K::kind(&()),
                    child.name = %name,
                    "Updated child resource owned fields"
                );
                Ok((SyncOutcome::Updated, updated))
            } else {
                debug!(child.kind = %K::kind(&()), child.name = %name, "child.unchanged");
                Ok((SyncOutcome::Unchanged, live))
            }
        }
    }
}

/// A child write the API server rejects as invalid will be rejected again on every
/// retry (a Job's pod template is immutable, for one), so it is fatal until the
/// workload or the child changes.
fn write_error(owner: &WorkloadKey, error: StoreError) -> ReconcileError {
    match error {
        StoreError::Invalid {
            kind,
            name,
            message,
            ..
        } => ReconcileError::Fatal {
            key: owner.clone(),
            reason: format!("{kind} {name} rejected by the API server: {message}"),
        },
        other => ReconcileError::Transient(other),
    }
}

/// Ensure every desired child in order, short-circuiting on the first failure.
///
/// # Errors
///
/// The first error returned by [`ensure_child`].
pub async fn ensure_children<S: ObjectStore>(
    store: &S,
    owner: &WorkloadKey,
    desired: Vec<ChildObject>,
) -> Result<Vec<EnsuredChild>, ReconcileError> {
    let mut ensured = Vec::with_capacity(desired.len());
    for child in desired {
        let (outcome, object) = match child {
            ChildObject::Deployment(d) => {
                let (outcome, live) = ensure_child(store, owner, d).await?;
                (outcome, ChildObject::Deployment(live))
            }
            ChildObject::Service(s) => {
                let (outcome, live) = ensure_child(store, owner, s).await?;
                (outcome, ChildObject::Service(live))
            }
            ChildObject::Job(j) => {
                let (outcome, live) = ensure_child(store, owner, j).await?;
                (outcome, ChildObject::Job(live))
            }
        };
        ensured.push(EnsuredChild { outcome, object });
    }
    Ok(ensured)
}

/// Owner labels plus the instance label.
#[must_use]
pub fn child_labels<W: Workload>(owner: &W) -> BTreeMap<String, String> {
    let mut labels = owner.labels().clone();
    labels.insert(INSTANCE_LABEL.to_string(), owner.name_any());
    labels
}

/// Metadata shared by every child: same name and namespace as the owner, the
/// owner's labels, and a controller owner reference.
///
/// # Errors
///
/// [`ReconcileError::Fatal`] when the owner has no uid to reference.
pub fn child_metadata<W: Workload>(owner: &W) -> Result<ObjectMeta, ReconcileError> {
    let owner_ref = owner
        .controller_owner_ref(&())
        .ok_or_else(|| ReconcileError::Fatal {
            key: WorkloadKey::from_resource(owner),
            reason: "workload has no uid to reference from its children".to_string(),
        })?;

    Ok(ObjectMeta {
        name: Some(owner.name_any()),
        namespace: owner.namespace(),
        labels: Some(child_labels(owner)),
        owner_references: Some(vec![owner_ref]),
        ..ObjectMeta::default()
    })
}

/// The owner's pod template, validated, with `labels` merged into its metadata.
///
/// # Errors
///
/// [`ReconcileError::Fatal`] when the template has no containers or a container
/// has no image.
pub fn pod_template<W: Workload>(
    owner: &W,
    labels: &BTreeMap<String, String>,
) -> Result<PodTemplateSpec, ReconcileError> {
    let fatal = |reason: String| ReconcileError::Fatal {
        key: WorkloadKey::from_resource(owner),
        reason,
    };

    let mut template = owner.workload_spec().template.clone();
    let pod = template
        .spec
        .as_ref()
        .ok_or_else(|| fatal("spec.template.spec is missing".to_string()))?;
    if pod.containers.is_empty() {
        return Err(fatal("spec.template.spec.containers is empty".to_string()));
    }
    if let Some(container) = pod
        .containers
        .iter()
        .find(|c| c.image.as_deref().is_none_or(str::is_empty))
    {
        return Err(fatal(format!("container {} has no image", container.name)));
    }

    let meta = template.metadata.get_or_insert_with(ObjectMeta::default);
    meta.labels = Some(diff::merge_labels(meta.labels.as_ref(), labels));
    Ok(template)
}

/// Project a core Kubernetes condition onto the status snapshot type.
pub(crate) fn child_condition(
    r#type: &str,
    status: &str,
    reason: Option<&str>,
    message: Option<&str>,
) -> ChildCondition {
    ChildCondition {
        r#type: r#type.to_string(),
        status: status.to_string(),
        reason: reason.unwrap_or_default().to_string(),
        message: message.unwrap_or_default().to_string(),
    }
}
