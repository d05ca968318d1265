use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};

use crate::dto::analytics_dto::UserQuery;
use crate::AppState;

#[axum::debug_handler]
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> crate::error::Result<Response> {
    let dashboard = state.analytics_service.overview(query.user_id).await?;
    Ok(Json(dashboard).into_response())
}

#[axum::debug_handler]
pub async fn insight(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> crate::error::Result<Response> {
    let insight = state.insight_service.get_insight(query.user_id).await?;
    Ok(Json(insight).into_response())
}
