//! API route table.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{self, ServiceState};

pub fn api_routes(state: ServiceState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/predict", post(handlers::predict))
        .route("/history", get(handlers::history))
        .route("/alerts", get(handlers::alerts))
        .route("/alerts/:id", delete(handlers::delete_alert))
        .route("/health", get(handlers::health))
        .route("/reset", post(handlers::reset))
        .route("/train", post(handlers::train))
        .with_state(state)
}
