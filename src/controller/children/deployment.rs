//! # Notebook Deployment
//!
//! Single-replica Deployment running the notebook server.

use super::{child_condition, child_metadata, diff, pod_template, ChildObservation, ChildResource};
use crate::constants::{DEFAULT_NOTEBOOK_PORT, DEFAULT_NOTEBOOK_REPLICAS};
use crate::controller::reconciler::ReconcileError;
use crate::crd::Notebook;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{ContainerPort, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};

/// Deployment for a notebook.
///
/// # Errors
///
/// [`ReconcileError::Fatal`] when the notebook's pod template is unusable.
pub fn desired_deployment(notebook: &Notebook) -> Result<Deployment, ReconcileError> {
    let metadata = child_metadata(notebook)?;
    let labels = metadata.labels.clone().unwrap_or_default();
    let mut template = pod_template(notebook, &labels)?;
    ensure_notebook_port(&mut template);

    Ok(Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(DEFAULT_NOTEBOOK_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels),
                ..LabelSelector::default()
            },
            template,
            ..DeploymentSpec::default()
        }),
        status: None,
    })
}

/// Port the notebook server listens on: the first container's first declared
/// port, else the default.
#[must_use]
pub fn notebook_port(template: &PodTemplateSpec) -> i32 {
    template
        .spec
        .as_ref()
        .and_then(|pod| pod.containers.first())
        .and_then(|c| c.ports.as_ref())
        .and_then(|ports| ports.first())
        .map_or(DEFAULT_NOTEBOOK_PORT, |p| p.container_port)
}

fn ensure_notebook_port(template: &mut PodTemplateSpec) {
    let Some(container) = template
        .spec
        .as_mut()
        .and_then(|pod| pod.containers.first_mut())
    else {
        return;
    };
    if container.ports.as_ref().is_none_or(Vec::is_empty) {
        container.ports = Some(vec![ContainerPort {
            name: Some("http".to_string()),
            container_port: DEFAULT_NOTEBOOK_PORT,
            protocol: Some("TCP".to_string()),
            ..ContainerPort::default()
        }]);
    }
}

impl ChildResource for Deployment {
    // The selector is immutable once created and is never written back.
    fn copy_owned_fields(desired: &Self, live: &mut Self) -> bool {
        let mut changed = diff::union_labels(desired.metadata.labels.as_ref(), &mut live.metadata.labels);

        let Some(want) = desired.spec.as_ref() else {
            return changed;
        };
        let have = live.spec.get_or_insert_with(DeploymentSpec::default);

        if have.replicas != want.replicas {
            have.replicas = want.replicas;
            changed = true;
        }

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
        Some(ChildObservation {
            ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            condition: status
                .and_then(|s| s.conditions.as_ref())
                .and_then(|conditions| conditions.first())
                .map(|c| {
                    child_condition(&c.type_, &c.status, c.reason.as_deref(), c.message.as_deref())
                }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::notebook;
    use super::*;
    use crate::constants::INSTANCE_LABEL;
    use k8s_openapi::api::apps::v1::{DeploymentCondition, DeploymentStatus};
    use k8s_openapi::api::core::v1::ResourceRequirements;
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use std::collections::BTreeMap;

    #[test]
    fn test_desired_deployment_shape() {
        let deployment = desired_deployment(&notebook("nb1")).unwrap();
        let spec = deployment.spec.as_ref().unwrap();

        assert_eq!(deployment.metadata.name.as_deref(), Some("nb1"));
        assert_eq!(spec.replicas, Some(1));

        let selector = spec.selector.match_labels.as_ref().unwrap();
        assert_eq!(selector.get("app").map(String::as_str), Some("nb1"));
        assert_eq!(selector.get(INSTANCE_LABEL).map(String::as_str), Some("nb1"));

        let template_labels = spec.template.metadata.as_ref().unwrap().labels.as_ref().unwrap();
        assert_eq!(template_labels, selector);

        let ports = spec.template.spec.as_ref().unwrap().containers[0]
            .ports
            .as_ref()
            .unwrap();
        assert_eq!(ports[0].container_port, 8888);
    }

    #[test]
    fn test_declared_port_is_kept() {
        let mut nb = notebook("nb1");
        if let Some(pod) = nb.spec.workload.template.spec.as_mut() {
            pod.containers[0].ports = Some(vec![ContainerPort {
                container_port: 9999,
                ..ContainerPort::default()
            }]);
        }
        let deployment = desired_deployment(&nb).unwrap();
        let template = &deployment.spec.as_ref().unwrap().template;
        assert_eq!(notebook_port(template), 9999);
        assert_eq!(
            template.spec.as_ref().unwrap().containers[0].ports.as_ref().unwrap().len(),
            1
        );
    }

    #[test]
    fn test_copy_owned_fields_unlabeled_live() {
        let desired = desired_deployment(&notebook("nb1")).unwrap();
        let mut live = desired.clone();
        live.metadata.labels = None;

        assert!(Deployment::copy_owned_fields(&desired, &mut live));
        assert_eq!(live.metadata.labels, desired.metadata.labels);
        assert!(!Deployment::copy_owned_fields(&desired, &mut live));
    }

    #[test]
    fn test_copy_owned_fields_ignores_selector_and_status() {
        let desired = desired_deployment(&notebook("nb1")).unwrap();
        let mut live = desired.clone();
        if let Some(spec) = live.spec.as_mut() {
            spec.selector.match_labels = None;
            spec.progress_deadline_seconds = Some(600);
        }
        live.status = Some(DeploymentStatus {
            ready_replicas: Some(1),
            ..DeploymentStatus::default()
        });

        assert!(!Deployment::copy_owned_fields(&desired, &mut live));
    }

    #[test]
    fn test_copy_owned_fields_accepts_canonical_quantities() {
        let mut nb = notebook("nb1");
        if let Some(pod) = nb.spec.workload.template.spec.as_mut() {
            pod.containers[0].resources = Some(ResourceRequirements {
                limits: Some(BTreeMap::from([("cpu".to_string(), Quantity("1000m".to_string()))])),
                requests: Some(BTreeMap::from([("memory".to_string(), Quantity("0.5Gi".to_string()))])),
                ..ResourceRequirements::default()
            });
        }
        let desired = desired_deployment(&nb).unwrap();

        // As returned by the API server
        let mut live = desired.clone();
        if let Some(pod) = live.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
            pod.containers[0].resources = Some(ResourceRequirements {
                limits: Some(BTreeMap::from([("cpu".to_string(), Quantity("1".to_string()))])),
                requests: Some(BTreeMap::from([("memory".to_string(), Quantity("512Mi".to_string()))])),
                ..ResourceRequirements::default()
            });
        }

        assert!(!Deployment::copy_owned_fields(&desired, &mut live));
    }

    #[test]
    fn test_copy_owned_fields_replicas_and_image_drift() {
        let desired = desired_deployment(&notebook("nb1")).unwrap();
        let mut live = desired.clone();
        if let Some(spec) = live.spec.as_mut() {
            spec.replicas = Some(3);
            if let Some(pod) = spec.template.spec.as_mut() {
                pod.containers[0].image = Some("jupyter/old:1".to_string());
            }
        }

        assert!(Deployment::copy_owned_fields(&desired, &mut live));
        let spec = live.spec.unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.template.spec.unwrap().containers[0].image.as_deref(),
            Some("jupyter/base-notebook:latest")
        );
    }

    #[test]
    fn test_observe_reports_ready_replicas_and_first_condition() {
        let mut live = desired_deployment(&notebook("nb1")).unwrap();
        live.status = Some(DeploymentStatus {
            ready_replicas: Some(1),
            conditions: Some(vec![DeploymentCondition {
                type_: "Available".to_string(),
                status: "False".to_string(),
                reason: Some("MinimumReplicasUnavailable".to_string()),
                ..DeploymentCondition::default()
            }]),
            ..DeploymentStatus::default()
        });

        let observation = live.observe().unwrap();
        assert_eq!(observation.ready_replicas, 1);
        let condition = observation.condition.unwrap();
        assert_eq!(condition.r#type, "Available");
        assert_eq!(condition.status, "False");
        assert_eq!(condition.reason, "MinimumReplicasUnavailable");
    }
}
