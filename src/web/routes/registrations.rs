use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::RegistrationPatch;
use crate::services::registration_service::{
    self, NewRegistrationRequest, RegistrationView, SyncedRegistration,
};
use crate::web::error::{api_error, from_registration, internal, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegistrationListQuery {
    problem_statement_id: Option<String>,
}

pub async fn create_registration_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<NewRegistrationRequest>,
) -> Result<(StatusCode, Json<SyncedRegistration>), (StatusCode, Json<Value>)> {
    registration_service::create_registration(&state.pool, &state.feed, &state.sync, &event_id, body)
        .await
        .map(|created| (StatusCode::CREATED, Json(created)))
        .map_err(|e| from_registration("create registration", e))
}

pub async fn registration_by_code_handler(
    State(state): State<AppState>,
    Path(reg_code): Path<String>,
) -> ApiResult<RegistrationView> {
    registration_service::load_by_code(&state.pool, &reg_code)
        .await
        .map(Json)
        .map_err(|e| from_registration("load registration", e))
}

pub async fn update_registration_handler(
    State(state): State<AppState>,
    Path((event_id, reg_code)): Path<(String, String)>,
    Json(patch): Json<RegistrationPatch>,
) -> ApiResult<SyncedRegistration> {
    registration_service::update_by_code(&state.pool, &state.sync, &event_id, &reg_code, patch)
        .await
        .map(Json)
        .map_err(|e| from_registration("update registration", e))
}

pub async fn attendance_link_handler(
    State(state): State<AppState>,
    Path(reg_code): Path<String>,
) -> ApiResult<Value> {
    let origin = state.config.public_origin.as_deref();
    match registration_service::attendance_link(&state.pool, &reg_code, origin).await {
        Ok(Some(url)) => Ok(Json(json!({ "url": url }))),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, "not_found", "registration not found")),
        Err(e) => Err(internal("attendance link", e)),
    }
}

pub async fn admin_list_registrations_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<RegistrationListQuery>,
) -> ApiResult<Vec<RegistrationView>> {
    registration_service::list_for_event(
        &state.pool,
        &event_id,
        query.problem_statement_id.as_deref(),
    )
    .await
    .map(Json)
    .map_err(|e| internal("list registrations", e))
}

pub async fn toggle_lock_handler(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> ApiResult<RegistrationView> {
    registration_service::toggle_lock(&state.pool, &state.feed, &registration_id)
        .await
        .map(Json)
        .map_err(|e| from_registration("toggle lock", e))
}
