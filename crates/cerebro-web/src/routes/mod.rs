pub mod plans;

use std::sync::Arc;

use axum::response::Json;
use axum::routing::get;
use axum::Router;

use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(plans::routes())
        .fallback(not_found)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "OK",
        "service": "CEREBRO API",
    }))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
