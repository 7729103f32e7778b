use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::problem_statements_repo;
use crate::services::event_service;
use crate::services::in_flight::InFlightEntry;
use crate::services::sheet_rows_service;
use crate::services::sheets_gateway::SheetResponse;
use crate::web::error::{api_error, from_sync, internal, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportBody {
    problem_id: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct InFlightQuery {
    older_than_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BulkSyncBody {
    #[serde(default)]
    event_ids: Option<Vec<String>>,
}

pub async fn ensure_spreadsheet_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<Value> {
    state
        .sync
        .ensure_event_spreadsheet(&event_id)
        .await
        .map(|spreadsheet_id| Json(json!({ "spreadsheet_id": spreadsheet_id })))
        .map_err(|e| from_sync("ensure spreadsheet", e))
}

pub async fn sync_event_registrations_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> ApiResult<SheetResponse> {
    state
        .sync
        .sync_all_registrations(&event_id)
        .await
        .map(Json)
        .map_err(|e| from_sync("sync event registrations", e))
}

pub async fn sync_problem_statement_handler(
    State(state): State<AppState>,
    Path(problem_id): Path<String>,
) -> ApiResult<Value> {
    let problem = problem_statements_repo::load_problem_statement(&state.pool, &problem_id)
        .await
        .map_err(|e| internal("load problem statement", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "not_found", "problem statement not found"))?;

    state
        .sync
        .add_problem_statement(&problem.event_id, &problem.id, &problem.title)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(|e| from_sync("sync problem statement", e))
}

pub async fn append_registration_handler(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> ApiResult<Value> {
    state
        .sync
        .append_registration(&registration_id)
        .await
        .map(|_| Json(json!({ "success": true })))
        .map_err(|e| from_sync("append registration", e))
}

pub async fn append_registration_row_handler(
    State(state): State<AppState>,
    Path(registration_id): Path<String>,
) -> ApiResult<SheetResponse> {
    sheet_rows_service::append_registration_row(&state.pool, state.sync.gateway(), &registration_id)
        .await
        .map(Json)
        .map_err(|e| from_sync("append registration row", e))
}

pub async fn export_event_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(body): Json<ExportBody>,
) -> ApiResult<SheetResponse> {
    sheet_rows_service::export_event(&state.pool, state.sync.gateway(), &event_id, &body.problem_id)
        .await
        .map(Json)
        .map_err(|e| from_sync("export event", e))
}

pub async fn bulk_sync_handler(
    State(state): State<AppState>,
    body: Option<Json<BulkSyncBody>>,
) -> ApiResult<SheetResponse> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let events = event_service::build_event_summaries(&state.pool, body.event_ids.as_deref())
        .await
        .map_err(|e| internal("build event summaries", e))?;
    info!(events = events.len(), "bulk sync requested");

    state
        .sync
        .bulk_sync(events)
        .await
        .map(Json)
        .map_err(|e| from_sync("bulk sync", e))
}

/// Lists running operations, oldest first. `?older_than_ms=N` keeps only the
/// keys that have been held for longer than N milliseconds.
pub async fn in_flight_handler(
    State(state): State<AppState>,
    Query(query): Query<InFlightQuery>,
) -> Json<Vec<InFlightEntry>> {
    let ops = state.sync.in_flight();
    let mut entries = ops.snapshot();
    if let Some(ms) = query.older_than_ms {
        let stale = ops.older_than(Duration::from_millis(ms));
        entries.retain(|e| stale.contains(&e.key));
    }
    Json(entries)
}
