//! # Controller
//!
//! The reconcile engine and the pieces it is built from.
//!
//! ## Module Structure
//!
//! - `reconciler/` - One convergence pass per workload
//! - `children/` - Child resource generation and synchronization
//! - `conditions.rs` - Ordered, deduplicated condition history
//! - `finalizer.rs` - Finalizer-gated deletion
//! - `backoff.rs` - Fibonacci backoff for transient errors
//! - `server.rs` - Health server

pub mod backoff;
pub mod children;
pub mod conditions;
pub mod finalizer;
pub mod reconciler;
pub mod server;
