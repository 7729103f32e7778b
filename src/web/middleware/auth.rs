use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::admin_session_service::ADMIN_SESSION_COOKIE;
use crate::web::state::AppState;

#[derive(Clone, Debug)]
pub struct AdminSession {
    pub token: String,
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", ADMIN_SESSION_COOKIE);
    headers
        .get(header::COOKIE)
        .and_then(|hv| hv.to_str().ok())
        .and_then(|cookies| {
            cookies
                .split(';')
                .map(str::trim)
                .find_map(|c| c.strip_prefix(prefix.as_str()))
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        })
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(request.headers()) {
        if state.sessions.is_valid(&token) {
            request.extensions_mut().insert(AdminSession { token });
            return next.run(request).await;
        }
    }

    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized", "detail": "admin login required" })),
    )
        .into_response()
}
