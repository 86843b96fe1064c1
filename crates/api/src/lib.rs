//! Fraud Detection API Server
//!
//! REST API serving fraud predictions for card transactions, with
//! Prometheus metrics for fraud rate and input drift.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use inference_engine::InferenceEngine;
use metrics_recorder::MetricsRecorder;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

pub mod config;
pub mod error;
mod routes;
pub mod service;

pub use config::{AppConfig, LoggingConfig};
pub use error::ServiceError;
pub use service::{InferenceService, PredictionResult, RiskLevel, ServiceHealth};

/// Application state shared across handlers
pub struct AppState {
    /// Inference service (read-only model plus metrics)
    pub service: Arc<InferenceService>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(service: InferenceService) -> Self {
        Self {
            service: Arc::new(service),
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(routes::health::health))
        .route("/health", get(routes::health::health))
        .route("/predict", post(routes::predict::predict))
        .route("/predict-batch", post(routes::predict::predict_batch))
        .route("/model-info", get(routes::health::model_info))
        .route("/metrics", get(routes::metrics::metrics))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            routes::metrics::track_metrics,
        ))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize logging. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if config.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    }
}

/// Run the server until Ctrl-C
pub async fn run_server(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let metrics = Arc::new(MetricsRecorder::new()?);
    let engine = InferenceEngine::load(&config.model.manifest_path, config.model.expected_profile);
    let service = InferenceService::new(engine, metrics, config.service.clone());

    let state = Arc::new(AppState::new(service));
    let app = create_router(state.clone(), config.server.max_upload_bytes);

    let addr = config.bind_addr();
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped: {}", state.service.metrics().snapshot());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
