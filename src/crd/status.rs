//! # Workload Status
//!
//! Observed state written back by the controller: the condition history,
//! lifecycle timestamps, and the snapshot of the last child condition seen.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status subresource shared by every workload kind.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadStatus {
    /// Latest observations, most recent first. At most one entry per type.
    #[serde(default)]
    pub conditions: Vec<WorkloadCondition>,
    /// When the workload was first acknowledged by the controller (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// When the workload reached a terminal condition (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,
    /// Last time a reconcile pass changed this status (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconcile_time: Option<String>,
    /// Ready replicas reported by the primary child.
    #[serde(default)]
    pub ready_replicas: i32,
    /// Last child condition folded into `conditions`; used for change detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_condition: Option<ChildCondition>,
}

/// One entry of the workload condition history.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadCondition {
    pub r#type: ConditionType,
    pub status: ConditionStatus,
    /// The last time this condition was updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    /// Last time the condition's status changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    /// Human readable details about the transition.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Lifecycle phases a workload can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionType {
    /// The child resource has been created and is rolling out.
    Starting,
    /// The child resource is available.
    Running,
    /// The child resource reports a problem.
    Warning,
    /// The workload completed successfully.
    Succeeded,
    /// The workload failed.
    Failed,
    /// The workload was stopped or deleted.
    Stopped,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Starting => "Starting",
            ConditionType::Running => "Running",
            ConditionType::Warning => "Warning",
            ConditionType::Succeeded => "Succeeded",
            ConditionType::Failed => "Failed",
            ConditionType::Stopped => "Stopped",
        }
    }

    /// Terminal types are only ever set by completion or deletion signals.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConditionType::Succeeded | ConditionType::Failed | ConditionType::Stopped
        )
    }
}

impl fmt::Display for ConditionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    /// Parse the tri-state used by core Kubernetes conditions.
    #[must_use]
    pub fn from_k8s(value: &str) -> Self {
        match value {
            "True" => ConditionStatus::True,
            "False" => ConditionStatus::False,
            _ => ConditionStatus::Unknown,
        }
    }
}

/// Projection of a child resource's top-level condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChildCondition {
    pub r#type: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}
