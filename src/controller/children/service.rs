//! # Notebook Service
//!
//! ClusterIP Service exposing the notebook server port.

use super::deployment::notebook_port;
use super::{child_metadata, diff, ChildResource};
use crate::controller::reconciler::ReconcileError;
use crate::crd::Notebook;
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// Service for a notebook, selecting the notebook's pods.
///
/// # Errors
///
/// [`ReconcileError::Fatal`] when the notebook has no uid.
pub fn desired_service(notebook: &Notebook) -> Result<Service, ReconcileError> {
    let metadata = child_metadata(notebook)?;
    let selector = metadata.labels.clone();
    let port = notebook_port(&notebook.spec.workload.template);

    Ok(Service {
        metadata,
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector,
            ports: Some(vec![ServicePort {
                name: Some("http".to_string()),
                port,
                protocol: Some("TCP".to_string()),
                target_port: Some(IntOrString::Int(port)),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        status: None,
    })
}

impl ChildResource for Service {
    fn copy_owned_fields(desired: &Self, live: &mut Self) -> bool {
        let mut changed = diff::union_labels(desired.metadata.labels.as_ref(), &mut live.metadata.labels);

        let Some(want) = desired.spec.as_ref() else {
            return changed;
        };
        let have = live.spec.get_or_insert_with(ServiceSpec::default);

        if have.selector != want.selector {
            have.selector.clone_from(&want.selector);
            changed = true;
        }
        if !diff::serialized_subset(&want.ports, &have.ports) {
            have.ports.clone_from(&want.ports);
            changed = true;
        }

        changed
    }
}
