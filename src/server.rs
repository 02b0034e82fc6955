//! HTTP server exposing the session to a presentation layer.
//!
//! This module provides a local HTTP API that:
//! - Reports the loaded dataset and the model report
//! - Classifies single samples via POST /predict
//! - Lists the inference history
//!
//! # Architecture
//!
//! ```text
//! Dashboard ──→ POST /predict ──→ AppState ──→ InferenceHistory
//!           ──→ GET  /report  ──→ AppState ──→ MetricsReporter
//! ```

use crate::core::metrics::{ClassifierEvaluation, MetricsReporter, ModelReport, SynthesizedReporter};
use crate::core::predictor::{PredictionInput, PredictionResult};
use crate::core::DatasetSummary;
use crate::session::{AggregateCounts, AppState, HistoryStats, InferenceRecord};
use axum::{
    extract::{Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16) -> Self {
        Self { port }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Response from the dataset endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetResponse {
    pub summary: DatasetSummary,
    pub aggregate: AggregateCounts,
    pub loaded_at: DateTime<Utc>,
}

/// Query parameters of the report endpoint
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Use the placeholder reporter instead of evaluating the predictor
    #[serde(default)]
    pub synthesized: bool,
    pub seed: Option<u64>,
}

/// Response from the predict endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    pub aggregate: AggregateCounts,
}

/// Response from the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub stats: HistoryStats,
    pub records: Vec<InferenceRecord>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// GET /dataset
async fn dataset(State(state): State<Arc<AppState>>) -> Json<DatasetResponse> {
    let current = state.dataset();
    Json(DatasetResponse {
        summary: current.summary(),
        aggregate: state.aggregate_counts(),
        loaded_at: current.loaded_at,
    })
}

/// GET /report
async fn report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> Json<ModelReport> {
    let reporter: Box<dyn MetricsReporter> = if query.synthesized {
        match query.seed {
            Some(seed) => Box::new(SynthesizedReporter::seeded(seed)),
            None => Box::new(SynthesizedReporter::new()),
        }
    } else {
        Box::new(ClassifierEvaluation::new(state.pipeline().predictor()))
    };

    Json(state.report(reporter.as_ref()))
}

/// POST /predict
///
/// Classifies one sample and records it in the inference history.
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(input): Json<PredictionInput>,
) -> Result<Json<PredictResponse>, ApiError> {
    if !input.rt_ms.is_finite() || !input.gsr_mean.is_finite() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "rt_ms and gsr_mean must be finite numbers".to_string(),
                code: "INVALID_INPUT".to_string(),
            }),
        ));
    }

    let result = state.predict(input);
    tracing::debug!(
        rt_ms = input.rt_ms,
        gsr_mean = input.gsr_mean,
        label = %result.label,
        "Prediction recorded"
    );

    Ok(Json(PredictResponse {
        result,
        aggregate: state.aggregate_counts(),
    }))
}

/// GET /history
async fn history(State(state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let history = state.history();
    Json(HistoryResponse {
        stats: history.stats(),
        records: history.records(),
    })
}

/// Build the router over a shared session.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/dataset", get(dataset))
        .route("/report", get(report))
        .route("/predict", post(predict))
        .route("/history", get(history))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
    state: Arc<AppState>,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("NeuroGuard server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
