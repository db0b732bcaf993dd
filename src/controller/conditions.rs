//! # Condition Tracking
//!
//! Maintains the workload condition history.
//!
//! Conditions are held as an ordered map: the sequence gives "most recent first"
//! and the index by type guarantees a single entry per type. Updating a type moves
//! it to the front, so the history is bounded by the number of condition types.

use crate::crd::{ChildCondition, ConditionStatus, ConditionType, WorkloadCondition};
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;

/// RFC3339 timestamp with second precision, as the API server renders them.
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Ordered, type-keyed condition history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    order: Vec<ConditionType>,
    by_type: HashMap<ConditionType, WorkloadCondition>,
}

impl ConditionSet {
    /// Build from a persisted list. Later duplicates of a type are dropped.
    #[must_use]
    pub fn from_conditions(conditions: &[WorkloadCondition]) -> Self {
        let mut set = Self::default();
        for condition in conditions {
            if set.by_type.contains_key(&condition.r#type) {
                continue;
            }
            set.order.push(condition.r#type);
            set.by_type.insert(condition.r#type, condition.clone());
        }
        set
    }

    #[must_use]
    pub fn get(&self, condition_type: ConditionType) -> Option<&WorkloadCondition> {
        self.by_type.get(&condition_type)
    }

    /// The most recently updated condition.
    #[must_use]
    pub fn current(&self) -> Option<&WorkloadCondition> {
        self.order.first().and_then(|t| self.by_type.get(t))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorkloadCondition> {
        self.order.iter().filter_map(|t| self.by_type.get(t))
    }

    /// True when the current condition is a terminal type with status True.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current()
            .is_some_and(|c| c.r#type.is_terminal() && c.status == ConditionStatus::True)
    }

    /// True when the current condition is a Warning.
    #[must_use]
    pub fn has_warning(&self) -> bool {
        self.current()
            .is_some_and(|c| c.r#type == ConditionType::Warning)
    }

    /// Insert or update the condition of `condition_type`.
    ///
    /// Returns `false` and leaves the set untouched when the current condition is of
    /// the same type and already carries the same status and reason. Otherwise the
    /// condition is moved to the front; `lastTransitionTime` only moves when the
    /// status changes.
    pub fn upsert(
        &mut self,
        condition_type: ConditionType,
        status: ConditionStatus,
        reason: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let now = timestamp(now);
        let mut candidate = WorkloadCondition {
            r#type: condition_type,
            status,
            last_update_time: Some(now.clone()),
            last_transition_time: Some(now),
            reason: reason.to_string(),
            message: message.to_string(),
        };

        if let Some(existing) = self.by_type.get(&condition_type) {
            let is_current = self.order.first() == Some(&condition_type);
            if is_current && existing.status == status && existing.reason == reason {
                return false;
            }
            if existing.status == status {
                candidate
                    .last_transition_time
                    .clone_from(&existing.last_transition_time);
            }
        }

        self.order.retain(|t| *t != condition_type);
        self.order.insert(0, condition_type);
        self.by_type.insert(condition_type, candidate);
        true
    }

    #[must_use]
    pub fn into_vec(mut self) -> Vec<WorkloadCondition> {
        self.order
            .iter()
            .filter_map(|t| self.by_type.remove(t))
            .collect()
    }
}

/// Upsert over a persisted condition list.
///
/// Returns the updated list and whether anything changed. When nothing changed the
/// returned list equals `current`.
#[must_use]
pub fn upsert(
    current: &[WorkloadCondition],
    condition_type: ConditionType,
    status: ConditionStatus,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> (Vec<WorkloadCondition>, bool) {
    let mut set = ConditionSet::from_conditions(current);
    if set.upsert(condition_type, status, reason, message, now) {
        (set.into_vec(), true)
    } else {
        (current.to_vec(), false)
    }
}

/// A workload condition derived from a child signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedCondition {
    pub r#type: ConditionType,
    pub status: ConditionStatus,
    pub reason: String,
    pub message: String,
}

impl DerivedCondition {
    fn from_child(condition_type: ConditionType, child: &ChildCondition) -> Self {
        let reason = if child.reason.is_empty() {
            child.r#type.clone()
        } else {
            child.reason.clone()
        };
        Self {
            r#type: condition_type,
            status: ConditionStatus::True,
            reason,
            message: child.message.clone(),
        }
    }
}

/// Map a progressing/available style child condition onto the workload taxonomy.
///
/// Never yields a terminal type.
#[must_use]
pub fn derive_from_child(child: &ChildCondition) -> Option<DerivedCondition> {
    let condition_type = match child.r#type.as_str() {
        "Progressing" => ConditionType::Starting,
        "Available" if child.status == "True" => ConditionType::Running,
        "Available" | "ReplicaFailure" => ConditionType::Warning,
        _ => return None,
    };
    Some(DerivedCondition::from_child(condition_type, child))
}

/// Map a run-to-completion child's terminal condition onto the workload taxonomy.
#[must_use]
pub fn completion_signal(child: &ChildCondition) -> Option<DerivedCondition> {
    if child.status != "True" {
        return None;
    }
    let condition_type = match child.r#type.as_str() {
        "Complete" => ConditionType::Succeeded,
        "Failed" => ConditionType::Failed,
        _ => return None,
    };
    Some(DerivedCondition::from_child(condition_type, child))
}
