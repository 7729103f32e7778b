use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::services::attendance_service::{
    self, AttendanceCounter, EventAttendanceOverview, TeamAttendanceView, ToggleOutcome,
};
use crate::web::error::{from_attendance, internal, ApiResult};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    member_name: String,
    /// Count the client last saw. Without it the stored count is used.
    expected_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct OverviewQuery {
    problem_statement_id: Option<String>,
}

pub async fn team_attendance_handler(
    State(state): State<AppState>,
    Path(reg_code): Path<String>,
) -> ApiResult<TeamAttendanceView> {
    attendance_service::load_team_attendance(
        &state.pool,
        &reg_code,
        state.config.attendance_update_limit,
    )
    .await
    .map(Json)
    .map_err(|e| from_attendance("load team attendance", e))
}

pub async fn toggle_attendance_handler(
    State(state): State<AppState>,
    Path(reg_code): Path<String>,
    Json(body): Json<ToggleBody>,
) -> ApiResult<ToggleOutcome> {
    let limit = state.config.attendance_update_limit;
    let result = match body.expected_count {
        Some(expected) => {
            attendance_service::toggle_member_attendance(
                &state.pool,
                &reg_code,
                &body.member_name,
                expected,
                limit,
            )
            .await
        }
        None => match AttendanceCounter::load(&state.pool, &reg_code, limit).await {
            Ok(mut counter) => counter.toggle(&state.pool, &body.member_name).await,
            Err(e) => Err(e),
        },
    };
    result
        .map(Json)
        .map_err(|e| from_attendance("toggle attendance", e))
}

pub async fn event_attendance_handler(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Query(query): Query<OverviewQuery>,
) -> ApiResult<EventAttendanceOverview> {
    attendance_service::load_event_attendance(
        &state.pool,
        &event_id,
        query.problem_statement_id.as_deref(),
    )
    .await
    .map(Json)
    .map_err(|e| internal("load event attendance", e))
}
