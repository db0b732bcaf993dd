//! # Workload Controller
//!
//! A Kubernetes controller that converges `Notebook` and `BatchJob` workloads into
//! the Deployments, Services and Jobs that run them.
//!
//! ## Overview
//!
//! For every workload the controller:
//!
//! 1. **Registers a finalizer** - before any child exists
//! 2. **Synchronizes children** - creates them, or updates only the fields it owns
//! 3. **Tracks conditions** - folds child state into a deduplicated condition history
//! 4. **Handles deletion** - records `Stopped` and releases the finalizer; children
//!    are removed by owner-reference cascade
//!
//! ## Features
//!
//! - **Write-free steady state**: converged workloads cause no API writes
//! - **Warning requeue**: workloads with a current Warning are re-checked periodically
//! - **Per-resource backoff**: transient failures back off along a Fibonacci sequence
//! - **Health endpoints**: HTTP endpoints for liveness and readiness checks

use anyhow::Result;
use tracing::info;
use workload_controller::runtime::{initialization::initialize, watch_loop::run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;

    run_watch_loop(init.client, init.context, init.server_state).await?;

    info!("Workload Controller stopped");
    Ok(())
}
