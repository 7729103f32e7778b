use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::models::{EventsRow, ProblemStatementsRow};
use crate::services::event_service::{self, EventDetail, EventInput, ProblemStatementInput};
use crate::web::error::{api_error, from_event, internal, ApiResult};
use crate::web::state::AppState;

pub async fn list_active_events_handler(State(state): State<AppState>) -> ApiResult<Vec<EventsRow>> {
    event_service::list_events(&state.pool, true)
        .await
        .map(Json)
        .map_err(|e| internal("list active events", e))
}

pub async fn event_detail_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<EventDetail> {
    match event_service::load_event_detail(&state.pool, &event_id).await {
        Ok(Some(detail)) => Ok(Json(detail)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "not_found", "event not found")),
        Err(e) => Err(internal("load event detail", e)),
    }
}

pub async fn admin_list_events_handler(State(state): State<AppState>) -> ApiResult<Vec<EventsRow>> {
    event_service::list_events(&state.pool, false)
        .await
        .map(Json)
        .map_err(|e| internal("list events", e))
}

pub async fn create_event_handler(
    State(state): State<AppState>,
    Json(body): Json<EventInput>,
) -> Result<(StatusCode, Json<EventsRow>), (StatusCode, Json<Value>)> {
    event_service::create_event(&state.pool, &state.feed, body)
        .await
        .map(|row| (StatusCode::CREATED, Json(row)))
        .map_err(|e| from_event("create event", e))
}

pub async fn update_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<EventInput>,
) -> ApiResult<EventsRow> {
    event_service::update_event(&state.pool, &state.feed, &event_id, body)
        .await
        .map(Json)
        .map_err(|e| from_event("update event", e))
}

pub async fn delete_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Value> {
    event_service::delete_event(&state.pool, &state.feed, &event_id)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(|e| from_event("delete event", e))
}

pub async fn create_problem_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<ProblemStatementInput>,
) -> Result<(StatusCode, Json<ProblemStatementsRow>), (StatusCode, Json<Value>)> {
    event_service::create_problem_statement(&state.pool, &state.feed, &event_id, body)
        .await
        .map(|row| (StatusCode::CREATED, Json(row)))
        .map_err(|e| from_event("create problem statement", e))
}

pub async fn update_problem_handler(
    State(state): State<AppState>,
    Path(problem_id): Path<String>,
    Json(body): Json<ProblemStatementInput>,
) -> ApiResult<ProblemStatementsRow> {
    event_service::update_problem_statement(&state.pool, &state.feed, &problem_id, body)
        .await
        .map(Json)
        .map_err(|e| from_event("update problem statement", e))
}

pub async fn delete_problem_handler(
    State(state): State<AppState>,
    Path(problem_id): Path<String>,
) -> ApiResult<Value> {
    event_service::delete_problem_statement(&state.pool, &state.feed, &problem_id)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(|e| from_event("delete problem statement", e))
}
