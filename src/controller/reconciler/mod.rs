//! # Reconciler
//!
//! Core reconciliation logic for `Notebook` and `BatchJob` workloads.
//!
//! The reconciler:
//! - Registers a finalizer before creating anything
//! - Creates and converges the workload's child resources
//! - Folds child state into the workload's condition history
//! - Records `Stopped` and releases the finalizer on deletion
//!
//! ## Reconciliation Flow
//!
//! 1. Fetch the workload (missing means done)
//! 2. Deletion or finalizer registration, if needed
//! 3. Ensure children (create / update owned fields / leave alone)
//! 4. Project live child state
//! 5. Update status if it changed
//! 6. Requeue while a warning is current

pub mod reconcile;
pub mod status;
pub mod types;

pub use status::fold_observation;
pub use types::{BackoffState, ReconcileError, ReconcileOutcome, Reconciler, WorkloadKey};
