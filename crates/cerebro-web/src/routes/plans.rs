use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use cerebro_core::identity::bearer_token;
use cerebro_core::model::Identity;
use cerebro_core::planner::{self, PlanReply, PlanRequest};

use crate::error::ApiError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/plans", post(create_plan))
}

/// The verified caller. Rejects with 401 before the body is read.
pub struct Caller(pub Identity);

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing token"))?;
        let token = bearer_token(header).ok_or_else(|| ApiError::unauthorized("Missing token"))?;

        let identity = state.identity.verify(token).await?;
        Ok(Self(identity))
    }
}

async fn create_plan(
    State(state): State<Arc<AppState>>,
    Caller(identity): Caller,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<PlanReply>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!("rejected plan request body: {}", e.body_text());
        ApiError::bad_request("Messages are required")
    })?;
    let transcript = request.transcript()?;

    let outcome = planner::plan_turn(&state.storage, &state.llm, &identity, transcript).await?;
    Ok(Json(outcome.reply))
}
