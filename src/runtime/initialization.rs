//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, health server
//! startup, and Kubernetes client setup.

use super::ControllerContext;
use crate::config::ControllerConfig;
use crate::constants::DEFAULT_LOG_LEVEL;
use crate::controller::finalizer::OwnerReferenceCascade;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::{Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Shared reconcile context
    pub context: Arc<ControllerContext>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - Configuration loading
/// - Tracing subscriber setup
/// - rustls crypto provider setup
/// - Health server startup
/// - Kubernetes client creation
/// - Reconciler setup
///
/// # Errors
///
/// Fails when no Kubernetes client configuration can be found.
pub async fn initialize() -> Result<InitializationResult> {
    let config = ControllerConfig::from_env();
    init_tracing(&config);

    // Must happen before the client opens any TLS connection
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = config.watch_namespace.as_deref().unwrap_or("*"),
        "Starting Workload Controller"
    );

    let server_state = Arc::new(ServerState::default());
    let server_port = config.health_port;
    let server_state_clone = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store = KubeStore::new(client.clone(), config.field_manager.clone());
    let reconciler = Reconciler::new(
        store,
        Arc::new(OwnerReferenceCascade),
        config.warning_requeue_duration(),
    );
    let context = Arc::new(ControllerContext::new(reconciler, config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        context,
        server_state,
    })
}

/// Install the global tracing subscriber.
///
/// `LOG_LEVEL` accepts any `EnvFilter` directive; an invalid directive falls back
/// to the default filter.
fn init_tracing(config: &ControllerConfig) {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json_logs() {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing subscriber already initialized: {e}");
    }
}
