//! # Workload Specs
//!
//! `Notebook` and `BatchJob` custom resources and the spec they share.

use k8s_openapi::api::core::v1::PodTemplateSpec;
use schemars::{json_schema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};

/// Desired state shared by every workload kind.
///
/// Mirrors the run-to-completion knobs of a `batch/v1` Job plus the pod
/// template the child resources are generated from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadSpec {
    /// Number of retries before the workload is marked failed.
    /// Defaults to 1 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_limit: Option<i32>,
    /// Duration in seconds, relative to start time, the workload may stay active
    /// before it is terminated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,
    /// Lifetime in seconds of a finished workload's child before it becomes
    /// eligible for garbage collection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds_after_finished: Option<i32>,
    /// Pod template the child resources run.
    #[schemars(schema_with = "pod_template_schema")]
    pub template: PodTemplateSpec,
}

/// Notebook workload: a long-running interactive server exposed through a Service.
///
/// # Example
///
/// ```yaml
/// apiVersion: workloads.microscaler.io/v1alpha1
/// kind: Notebook
/// metadata:
///   name: nb1
///   namespace: research
///   labels:
///     app: nb1
/// spec:
///   template:
///     spec:
///       containers:
///         - name: notebook
///           image: jupyter/base-notebook:latest
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "Notebook",
    group = "workloads.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::WorkloadStatus",
    shortname = "nb",
    printcolumn = r#"{"name":"Condition", "type":"string", "jsonPath":".status.conditions[0].type"}, {"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}, {"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct NotebookSpec {
    #[serde(flatten)]
    pub workload: WorkloadSpec,
}

/// Batch workload: a run-to-completion Job.
///
/// # Example
///
/// ```yaml
/// apiVersion: workloads.microscaler.io/v1alpha1
/// kind: BatchJob
/// metadata:
///   name: train-1
///   namespace: research
/// spec:
///   backoffLimit: 3
///   ttlSecondsAfterFinished: 600
///   template:
///     spec:
///       containers:
///         - name: train
///           image: registry.local/train:1.2
///           command: ["python", "train.py"]
/// ```
#[derive(kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[kube(
    kind = "BatchJob",
    group = "workloads.microscaler.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::WorkloadStatus",
    shortname = "bj",
    printcolumn = r#"{"name":"Condition", "type":"string", "jsonPath":".status.conditions[0].type"}, {"name":"Started", "type":"string", "jsonPath":".status.startTime"}, {"name":"Completed", "type":"string", "jsonPath":".status.completionTime"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobSpec {
    #[serde(flatten)]
    pub workload: WorkloadSpec,
}

/// Open schema for the embedded pod template.
///
/// The full core/v1 PodTemplateSpec schema is large and owned by the API server;
/// the CRD only requires an object and keeps every field.
fn pod_template_schema(_gen: &mut SchemaGenerator) -> Schema {
    json_schema!({
        "type": "object",
        "description": "Pod template the child resources are generated from (core/v1 PodTemplateSpec)",
        "x-kubernetes-preserve-unknown-fields": true
    })
}
