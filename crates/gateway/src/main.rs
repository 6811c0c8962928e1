//! Encore API Gateway
//!
//! The main entry point for all external API requests.
//! Handles:
//! - Session authentication
//! - Artist catalog and rating endpoints
//! - Rate limiting
//! - Observability (logging, metrics)

mod handlers;
mod middleware;
mod storage;

use axum::{
    extract::FromRef,
    routing::{delete, get, post, put},
    Router,
};
use encore_common::{
    auth::{AuthState, JwtManager},
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    metrics,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use storage::PhotoStore;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub auth: AuthState,
    pub photos: PhotoStore,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting Encore API Gateway v{}", encore_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();

    if config.observability.metrics_port > 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .install()?;
        info!("Prometheus exporter on port {}", config.observability.metrics_port);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Session token signing
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| AppError::Configuration {
            message: "auth.jwt_secret is required".to_string(),
        })?;
    let jwt = JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs);

    // Media storage for profile photos
    tokio::fs::create_dir_all(&config.media.root).await?;
    let photos = PhotoStore::new(config.media.root.clone(), config.media.public_base.clone());

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        auth: AuthState(Arc::new(jwt)),
        photos,
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

        // Auth endpoints
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/me", get(handlers::auth::me))

        // Artist endpoints
        .route("/artists", get(handlers::artists::list_artists))
        .route("/artists", post(handlers::artists::create_artist))
        .route("/artists/by-name/{name}", get(handlers::artists::get_artist_by_name))
        .route("/artists/{id}", get(handlers::artists::get_artist))
        .route("/artists/{id}", put(handlers::artists::update_artist))
        .route("/artists/{id}", delete(handlers::artists::delete_artist))

        // Rating endpoints
        .route("/artists/{id}/rating", post(handlers::ratings::rate_artist))
        .route("/artists/{id}/rating", get(handlers::ratings::get_rating));

    // Compose the app
    let mut app = Router::new()
        .nest("/v1", api_routes)
        .nest_service("/photos", ServeDir::new(state.config.media.root.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id);

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn(
            move |request: axum::extract::Request, next: axum::middleware::Next| {
                let limiter = limiter.clone();
                async move {
                    middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
                }
            },
        ));
    }

    app.with_state(state)
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
