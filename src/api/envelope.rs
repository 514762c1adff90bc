//! Response bodies shared by every handler.
//!
//! Successful calls return `{data, meta}`, failed calls return
//! `{error: {code, message}, meta}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data` wrapped in the envelope.
    pub fn ok(data: T) -> Response {
        Json(Self {
            data,
            meta: ResponseMeta::now(),
        })
        .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    fn with_status(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
        let body = Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::now(),
        };
        (status, Json(body)).into_response()
    }

    pub fn not_found(message: impl Into<String>) -> Response {
        Self::with_status(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Malformed body or query, or a sensor value outside its accepted range.
    pub fn bad_request(message: impl Into<String>) -> Response {
        Self::with_status(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// The engine could not produce a result. Never replaced by a default.
    pub fn prediction_failed(message: impl Into<String>) -> Response {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, "PREDICTION_FAILED", message)
    }

    pub fn training_failed(message: impl Into<String>) -> Response {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, "TRAINING_FAILED", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ok_response_shape() {
        let resp = ApiResponse::ok(serde_json::json!({"hello": "world"}));
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["data"]["hello"], "world");
        assert_eq!(v["meta"]["version"], env!("CARGO_PKG_VERSION"));
        assert!(v["meta"]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let resp = ApiErrorResponse::bad_request("limit must be a non-negative integer");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["code"], "BAD_REQUEST");
        assert!(v["data"].is_null());
    }

    #[tokio::test]
    async fn test_prediction_failed_shape() {
        let resp = ApiErrorResponse::prediction_failed("model exploded");
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v["error"]["code"], "PREDICTION_FAILED");
        assert_eq!(v["error"]["message"], "model exploded");
    }
}
