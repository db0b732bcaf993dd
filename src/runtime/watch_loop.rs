//! # Watch Loop
//!
//! Runs one `kube_runtime` controller per workload kind and restarts them if their
//! streams end before shutdown.
//!
//! - `Notebook` owns `Deployment` and `Service`
//! - `BatchJob` owns `Job`
//!
//! A change to an owned child re-triggers its owner through the owner reference.

use super::error_policy::{backoff_key, handle_reconciliation_error, handle_watch_stream_error};
use super::ControllerContext;
use crate::controller::children::OwnsChildren;
use crate::controller::reconciler::{ReconcileError, ReconcileOutcome, WorkloadKey};
use crate::controller::server::ServerState;
use crate::crd::{BatchJob, Notebook};
use crate::store::StoreObject;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::Service;
use kube::api::Api;
use kube::Client;
use kube_runtime::controller::{self, Action};
use kube_runtime::{watcher, Controller};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn, Instrument};

/// Run the controller watch loop until a shutdown signal is received.
///
/// # Errors
///
/// Currently never fails; the signature leaves room for startup checks.
pub async fn run_watch_loop(
    client: Client,
    ctx: Arc<ControllerContext>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let shutdown = Arc::new(AtomicBool::new(false));

    let shutdown_flag = Arc::clone(&shutdown);
    let shutdown_server_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        shutdown_flag.store(true, Ordering::Relaxed);
        shutdown_server_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            operation = "watch_loop",
            namespace = ctx.config.watch_namespace.as_deref().unwrap_or("*")
        );

        let notebooks = run_controller(
            Controller::new(workload_api::<Notebook>(&client, &ctx), watcher::Config::default())
                .owns(workload_api::<Deployment>(&client, &ctx), watcher::Config::default())
                .owns(workload_api::<Service>(&client, &ctx), watcher::Config::default()),
            Arc::clone(&ctx),
        );
        let batch_jobs = run_controller(
            Controller::new(workload_api::<BatchJob>(&client, &ctx), watcher::Config::default())
                .owns(workload_api::<Job>(&client, &ctx), watcher::Config::default()),
            Arc::clone(&ctx),
        );

        server_state.set_ready(true);
        info!("Controllers started for Notebook and BatchJob");
        async { futures::join!(notebooks, batch_jobs) }
            .instrument(watch_span)
            .await;

        if shutdown.load(Ordering::Relaxed) {
            info!("Controllers stopped after shutdown signal");
            break;
        }

        let delay = ctx.config.watch_restart_delay_duration();
        warn!(
            "Controller streams ended unexpectedly, restarting in {}s",
            delay.as_secs()
        );
        server_state.set_ready(false);
        tokio::time::sleep(delay).await;
    }

    Ok(())
}

fn workload_api<K: StoreObject>(client: &Client, ctx: &ControllerContext) -> Api<K> {
    match ctx.config.watch_namespace.as_deref() {
        Some(namespace) => Api::namespaced(client.clone(), namespace),
        None => Api::all(client.clone()),
    }
}

async fn run_controller<W: OwnsChildren>(controller: Controller<W>, ctx: Arc<ControllerContext>) {
    let concurrency = ctx.config.max_concurrent_reconciliations;
    controller
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_workload::<W>, handle_reconciliation_error::<W>, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj_ref, _action)) => debug!(object = %obj_ref, "watch.event.success"),
                Err(e) => handle_watch_stream_error(&e),
            }
        })
        .await;
}

/// Reconcile entry point handed to `kube_runtime`.
///
/// # Errors
///
/// Propagates the engine's [`ReconcileError`] to the error policy.
pub async fn reconcile_workload<W: OwnsChildren>(
    obj: Arc<W>,
    ctx: Arc<ControllerContext>,
) -> Result<Action, ReconcileError> {
    let key = WorkloadKey::from_resource(obj.as_ref());
    let outcome = ctx.reconciler.reconcile::<W>(&key).await?;
    ctx.reset_backoff(&backoff_key::<W>(&key));

    Ok(match outcome {
        ReconcileOutcome::Done => Action::await_change(),
        ReconcileOutcome::RequeueAfter(delay) => Action::requeue(delay),
    })
}
