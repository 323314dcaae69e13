use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/api/v1/execute", post(handlers::execute))
        .route("/api/v1/execute/args", post(handlers::execute_args))
        .route("/api/v1/grade", post(handlers::grade))
}
