//! # Custom Resource Definitions
//!
//! CRD types for the Workload Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `Notebook` and `BatchJob` resources and the shared `WorkloadSpec`
//! - `status.rs` - Status, condition history and child condition snapshot

mod spec;
mod status;

pub use spec::{BatchJob, BatchJobSpec, Notebook, NotebookSpec, WorkloadSpec};
pub use status::{
    ChildCondition, ConditionStatus, ConditionType, WorkloadCondition, WorkloadStatus,
};

use crate::store::StoreObject;

/// Common view over every workload kind the controller manages.
pub trait Workload: StoreObject {
    fn workload_spec(&self) -> &WorkloadSpec;

    fn workload_status(&self) -> Option<&WorkloadStatus>;

    fn set_workload_status(&mut self, status: WorkloadStatus);
}

impl Workload for Notebook {
    fn workload_spec(&self) -> &WorkloadSpec {
        &self.spec.workload
    }

    fn workload_status(&self) -> Option<&WorkloadStatus> {
        self.status.as_ref()
    }

    fn set_workload_status(&mut self, status: WorkloadStatus) {
        self.status = Some(status);
    }
}

impl Workload for BatchJob {
    fn workload_spec(&self) -> &WorkloadSpec {
        &self.spec.workload
    }

    fn workload_status(&self) -> Option<&WorkloadStatus> {
        self.status.as_ref()
    }

    fn set_workload_status(&mut self, status: WorkloadStatus) {
        self.status = Some(status);
    }
}
