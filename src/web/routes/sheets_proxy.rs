use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::services::sheets_gateway::ProxyError;
use crate::web::error::api_error;
use crate::web::state::AppState;

/// Relays a caller-built JSON body to the spreadsheet web app, status and all.
pub async fn sheets_proxy_handler(State(state): State<AppState>, body: String) -> Response {
    match state.proxy.forward_raw(body).await {
        Ok(reply) => {
            let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let content_type = reply
                .content_type
                .unwrap_or_else(|| "application/json".to_string());
            let mut response = Response::new(Body::from(reply.body));
            *response.status_mut() = status;
            if let Ok(value) = content_type.parse() {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response
        }
        Err(ProxyError::NotConfigured) => api_error(
            StatusCode::GONE,
            "not_configured",
            "sheets gateway is not configured",
        )
        .into_response(),
        Err(ProxyError::Transport(message)) => {
            warn!(error = %message, "sheets proxy request failed");
            api_error(StatusCode::BAD_GATEWAY, "sheets_proxy_failed", message).into_response()
        }
    }
}

pub async fn sheets_preflight_handler() -> StatusCode {
    StatusCode::NO_CONTENT
}
