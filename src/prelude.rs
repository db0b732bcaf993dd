//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use workload_controller::prelude::*;
//! ```

// CRD types - most commonly used
pub use crate::crd::*;

// Store seam - implemented by KubeStore and by test doubles
pub use crate::store::{KubeStore, ObjectStore, StoreError, StoreObject};

// Reconciler types - core controller functionality
pub use crate::controller::children::{ChildObservation, OwnsChildren, SyncOutcome};
pub use crate::controller::finalizer::{CleanupHook, OwnerReferenceCascade};
pub use crate::controller::reconciler::{
    ReconcileError, ReconcileOutcome, Reconciler, WorkloadKey,
};

// Config types - for configuration management
pub use crate::config::ControllerConfig;
