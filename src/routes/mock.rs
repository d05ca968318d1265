use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::analytics_dto::UserQuery;
use crate::dto::mock_dto::SubmitMockRequest;
use crate::AppState;

#[axum::debug_handler]
pub async fn submit_mock(
    State(state): State<AppState>,
    Json(req): Json<SubmitMockRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let recorded = state.mock_service.record_completed(req).await?;
    Ok(Json(recorded).into_response())
}

#[axum::debug_handler]
pub async fn get_mock(
    State(state): State<AppState>,
    Path(mock_attempt_id): Path<Uuid>,
    Query(query): Query<UserQuery>,
) -> crate::error::Result<Response> {
    let (attempt, responses) = state
        .mock_service
        .get_mock(query.user_id, mock_attempt_id)
        .await?;
    Ok(Json(json!({ "attempt": attempt, "responses": responses })).into_response())
}
