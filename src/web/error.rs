use axum::{http::StatusCode, Json};
use serde_json::{json, Value};
use tracing::warn;

use crate::services::attendance_service::AttendanceError;
use crate::services::event_service::EventError;
use crate::services::registration_service::RegistrationError;
use crate::services::sync_error::SyncError;

/// Error half of every JSON handler: `{ "error": <code>, "detail": <message> }`.
pub type ApiError = (StatusCode, Json<Value>);

pub type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn api_error(status: StatusCode, code: &str, detail: impl ToString) -> ApiError {
    (status, Json(json!({ "error": code, "detail": detail.to_string() })))
}

pub fn internal(context: &str, err: impl std::fmt::Display) -> ApiError {
    warn!("{} failed: {}", context, err);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}

pub fn from_sync(context: &str, err: SyncError) -> ApiError {
    match err {
        SyncError::Conflict(_) => api_error(StatusCode::CONFLICT, "in_progress", err),
        SyncError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "not_found", err),
        SyncError::Invalid(_) => api_error(StatusCode::BAD_REQUEST, "invalid", err),
        SyncError::Remote(ref message) => {
            warn!(error = %message, "{} sheet sync failed", context);
            api_error(StatusCode::BAD_GATEWAY, "sheet_sync_failed", message)
        }
        SyncError::Database(e) => internal(context, e),
    }
}

pub fn from_registration(context: &str, err: RegistrationError) -> ApiError {
    match err {
        RegistrationError::EventNotFound | RegistrationError::NotFound => {
            api_error(StatusCode::NOT_FOUND, "not_found", err)
        }
        RegistrationError::Locked => api_error(StatusCode::LOCKED, "locked", err),
        RegistrationError::EventClosed
        | RegistrationError::DeadlinePassed
        | RegistrationError::TeamSize { .. }
        | RegistrationError::ProblemMismatch
        | RegistrationError::Invalid(_) => api_error(StatusCode::BAD_REQUEST, "invalid", err),
        RegistrationError::Sync(e) => from_sync(context, e),
        RegistrationError::Database(e) => internal(context, e),
    }
}

pub fn from_attendance(context: &str, err: AttendanceError) -> ApiError {
    match err {
        AttendanceError::NotFound => api_error(StatusCode::NOT_FOUND, "not_found", err),
        AttendanceError::UnknownMember(_) => api_error(StatusCode::BAD_REQUEST, "invalid", err),
        AttendanceError::LimitReached { count, limit }
        | AttendanceError::ConcurrentUpdate { count, limit } => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "attendance_limit",
                "detail": err.to_string(),
                "attendance_update_count": count,
                "limit": limit,
            })),
        ),
        AttendanceError::Database(e) => internal(context, e),
    }
}

pub fn from_event(context: &str, err: EventError) -> ApiError {
    match err {
        EventError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "not_found", err),
        EventError::Invalid(_) => api_error(StatusCode::BAD_REQUEST, "invalid", err),
        EventError::Database(e) => internal(context, e),
    }
}
