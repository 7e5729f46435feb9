use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::activity_log::ActivityLog;
use crate::cache::ProviderCache;
use crate::config::Config;
use crate::provider::ProviderService;
use crate::registry::StashRegistry;
use crate::stash::StashClient;

pub mod routes_config;
pub mod routes_logs;
pub mod routes_provider;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub registry: Arc<StashRegistry>,
    pub provider: ProviderService,
    pub cache: Arc<ProviderCache>,
    pub client: StashClient,
    pub log: Arc<ActivityLog>,
}

impl AppContext {
    /// Wire up the full service graph from a loaded config.
    ///
    /// Must run inside a Tokio runtime (the activity log spawns its drain
    /// task on construction).
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(StashRegistry::new(config.stashes.clone()));
        let cache = Arc::new(ProviderCache::new());
        let client = StashClient::new();
        let log = ActivityLog::new();
        let provider = ProviderService::new(
            Arc::clone(&registry),
            client.clone(),
            Arc::clone(&cache),
            Arc::clone(&log),
        );
        Self {
            registry,
            provider,
            cache,
            client,
            log,
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Plex-facing provider surface
        .nest("/providers", routes_provider::provider_routes())
        // Admin API
        .nest("/api/config", routes_config::config_routes())
        .nest("/api/logs", routes_logs::log_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::from_config(&config);
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
