//! Chapterhouse API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Request routing
//! - Auth context extraction (principal verified upstream)
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use chapterhouse_common::{
    chapters::LockRegistry,
    config::AppConfig,
    db::DbPool,
    metrics,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub locks: Arc<LockRegistry>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .json()
        .init();

    info!("Starting Chapterhouse API Gateway v{}", chapterhouse_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    metrics::init_exporter(config.observability.metrics_port)?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        locks: Arc::new(LockRegistry::new()),
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let request_timeout = state.config.request_timeout();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Story endpoints
        .route("/stories", post(handlers::stories::create_story))
        .route("/stories", get(handlers::stories::list_stories))
        .route("/stories/{id}", get(handlers::stories::get_story))
        .route("/stories/{id}", patch(handlers::stories::update_story))
        .route("/stories/{id}", delete(handlers::stories::delete_story))
        // Chapter endpoints
        .route("/stories/{id}/chapters", post(handlers::chapters::create_chapter))
        .route("/stories/{id}/chapters", get(handlers::chapters::list_chapters))
        .route("/stories/{id}/chapters/order", put(handlers::chapters::reorder_chapters))
        .route("/chapters/{id}", get(handlers::chapters::get_chapter))
        .route("/chapters/{id}", delete(handlers::chapters::delete_chapter))
        // Engagement endpoints
        .route("/chapters/{id}/views", post(handlers::engagement::record_view))
        .route("/chapters/{id}/votes", post(handlers::engagement::toggle_vote))
        .route("/chapters/{id}/engagement", get(handlers::engagement::chapter_engagement))
        .route("/stories/{id}/engagement", get(handlers::engagement::story_engagement))
        // Reading progress endpoints
        .route("/stories/{id}/progress", put(handlers::progress::update_progress))
        .route("/stories/{id}/progress", get(handlers::progress::continue_chapter));

    // Compose the app
    Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
