//! API route handlers
//!
//! Every handler returns `Response` via [`ApiResponse::ok`] or [`ApiErrorResponse`].
//! Engine calls are CPU-bound and run on the blocking pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::ml_engine::{BundleInfo, EngineError, InferenceEngine};
use crate::monitor::{MonitorState, PredictionResponse};
use crate::types::SensorReading;

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ServiceState {
    pub engine: Arc<InferenceEngine>,
    pub monitor: Arc<RwLock<MonitorState>>,
}

impl ServiceState {
    pub fn new(engine: Arc<InferenceEngine>) -> Self {
        let monitor = MonitorState::new(&engine.config().monitor);
        Self {
            engine,
            monitor: Arc::new(RwLock::new(monitor)),
        }
    }
}

// ============================================================================
// Request / response types
// ============================================================================

/// Accepted inclusive range per sensor field.
pub const SENSOR_RANGES: [(&str, f64, f64); 4] = [
    ("temperature", 0.0, 200.0),
    ("vibration", 0.0, 20.0),
    ("pressure", 0.0, 500.0),
    ("rpm", 0.0, 5000.0),
];

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub severity: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrainRequest {
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model_trained: bool,
    pub timestamp: DateTime<Utc>,
    pub history_count: usize,
    pub alerts_count: usize,
    pub model: Option<BundleInfo>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Check every field against [`SENSOR_RANGES`], reporting all violations.
pub fn validate_ranges(reading: &SensorReading) -> Result<(), String> {
    let violations: Vec<String> = SENSOR_RANGES
        .iter()
        .zip(reading.to_features())
        .filter(|((_, lo, hi), v)| !(v.is_finite() && *v >= *lo && *v <= *hi))
        .map(|((name, lo, hi), v)| format!("{name} = {v} is outside [{lo}, {hi}]"))
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.join("; "))
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn root() -> Response {
    ApiResponse::ok(ServiceInfo {
        message: "Predictive Maintenance Inference API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /predict - sensor reading in, health prediction out",
            "GET /history - recent predictions",
            "GET /alerts - current alerts",
            "DELETE /alerts/:id - remove an alert",
            "GET /health - service health",
            "POST /reset - clear history and alerts",
            "POST /train - retrain the models",
        ],
    })
}

pub async fn predict(
    State(state): State<ServiceState>,
    body: Result<Json<SensorReading>, JsonRejection>,
) -> Response {
    let reading = match body {
        Ok(Json(reading)) => reading,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    if let Err(msg) = validate_ranges(&reading) {
        return ApiErrorResponse::bad_request(msg);
    }

    let engine = Arc::clone(&state.engine);
    let result = match tokio::task::spawn_blocking(move || engine.predict(&reading)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            warn!(error = %e, "Prediction failed");
            return match e {
                EngineError::InvalidInput { .. } => ApiErrorResponse::bad_request(e.to_string()),
                _ => ApiErrorResponse::prediction_failed(format!("Prediction failed: {e}")),
            };
        }
        Err(e) => {
            warn!(error = %e, "Prediction task panicked");
            return ApiErrorResponse::prediction_failed(format!("Prediction failed: {e}"));
        }
    };

    let response = PredictionResponse::from_result(&result, Utc::now());
    let alert = state
        .monitor
        .write()
        .await
        .record(reading, result.predicted_severity, &response);

    if let Some(alert) = alert {
        info!(
            alert_id = alert.id,
            severity = %alert.severity,
            root_cause = %response.root_cause,
            failure_risk = response.failure_risk,
            "Alert raised"
        );
    }

    ApiResponse::ok(response)
}

pub async fn history(
    State(state): State<ServiceState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    let limit = q.limit.unwrap_or(50);
    ApiResponse::ok(state.monitor.read().await.history(limit))
}

pub async fn alerts(
    State(state): State<ServiceState>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> Response {
    let q = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return ApiErrorResponse::bad_request(rejection.body_text()),
    };
    ApiResponse::ok(state.monitor.read().await.alerts(q.severity.as_deref()))
}

pub async fn delete_alert(State(state): State<ServiceState>, Path(id): Path<u64>) -> Response {
    if state.monitor.write().await.delete_alert(id) {
        ApiResponse::ok(MessageResponse {
            message: format!("Alert {id} deleted successfully"),
        })
    } else {
        ApiErrorResponse::not_found(format!("No alert with id {id}"))
    }
}

pub async fn health(State(state): State<ServiceState>) -> Response {
    let monitor = state.monitor.read().await;
    ApiResponse::ok(HealthResponse {
        status: "healthy",
        model_trained: state.engine.is_trained(),
        timestamp: Utc::now(),
        history_count: monitor.history_count(),
        alerts_count: monitor.alerts_count(),
        model: state.engine.bundle_info(),
    })
}

pub async fn reset(State(state): State<ServiceState>) -> Response {
    state.monitor.write().await.reset();
    info!("History and alerts cleared");
    ApiResponse::ok(MessageResponse {
        message: "System reset successfully".to_string(),
    })
}

/// Empty body trains with the configured seed; a body that is not a valid
/// `TrainRequest` is rejected rather than ignored.
pub async fn train(State(state): State<ServiceState>, body: Bytes) -> Response {
    let request = match parse_train_request(&body) {
        Ok(r) => r,
        Err(msg) => return ApiErrorResponse::bad_request(msg),
    };
    let engine = Arc::clone(&state.engine);
    let seed = request.seed.unwrap_or(engine.config().generator.seed);

    match tokio::task::spawn_blocking(move || engine.train_with_seed(seed)).await {
        Ok(Ok(info)) => ApiResponse::ok(info),
        Ok(Err(e)) => ApiErrorResponse::training_failed(format!("Training failed: {e}")),
        Err(e) => ApiErrorResponse::training_failed(format!("Training failed: {e}")),
    }
}

fn parse_train_request(body: &[u8]) -> Result<TrainRequest, String> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(TrainRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| format!("Invalid train request: {e}"))
}
