//! Padi Predictor API Server
//!
//! Serves a pre-trained rice yield regression model over HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    PADI PREDICTOR                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌──────────────────┐  │
//! │  │  CORS      │──▶│  Router    │──▶│  Predict Handler │  │
//! │  │  Gate      │   │  (Axum)    │   │                  │  │
//! │  └────────────┘   └─────┬──────┘   └────────┬─────────┘  │
//! │                         │ /, /health        ▼            │
//! │                         ▼            ┌──────────────┐    │
//! │                   ┌───────────┐      │ ModelService │    │
//! │                   │  Status   │─────▶│ (read-only)  │    │
//! │                   └───────────┘      └──────────────┘    │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod handlers;
mod inference;
mod middleware;


use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use std::net::SocketAddr;

use config::{Config, LogFormat, MODEL_PATH};
use inference::ModelService;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    init_tracing(config.log_format);

    tracing::info!("Padi Predictor starting...");
    if config.debug {
        tracing::warn!("Debug mode enabled: load diagnostics are returned to callers");
    }

    // Load model (failure leaves the service running in degraded mode)
    let model = ModelService::load(MODEL_PATH);
    if !model.is_loaded() {
        tracing::warn!("Serving without a model; /predict will return 500");
    }

    // Build application state
    let state = AppState {
        model,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "padi_predictor=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub model: ModelService,
    pub config: Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let cors = middleware::cors::cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::health::index).fallback(handlers::fallback::method_not_allowed))
        .route("/health", get(handlers::health::check).fallback(handlers::fallback::method_not_allowed))
        .route("/predict", post(handlers::predict::predict).fallback(handlers::fallback::method_not_allowed))
        .fallback(handlers::fallback::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
