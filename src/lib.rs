//! Workload Controller Library
//!
//! The reconcile engine for `Notebook` and `BatchJob` workloads, its Kubernetes
//! store, and the runtime wiring used by the controller binary.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod prelude;
pub mod runtime;
pub mod store;
