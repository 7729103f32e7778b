use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::services::admin_session_service::ADMIN_SESSION_COOKIE;
use crate::web::error::api_error;
use crate::web::middleware::auth::AdminSession;
use crate::web::state::AppState;

#[derive(Deserialize)]
pub struct AdminLoginBody {
    username: String,
    password: String,
}

fn session_cookie(value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(ADMIN_SESSION_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

fn with_cookie(mut response: Response, cookie: Cookie<'static>) -> Response {
    match cookie.to_string().parse() {
        Ok(value) => {
            response.headers_mut().append(header::SET_COOKIE, value);
            response
        }
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

pub async fn admin_login_handler(
    State(state): State<AppState>,
    Json(body): Json<AdminLoginBody>,
) -> Response {
    let Some(token) = state
        .sessions
        .login(&state.config, &body.username, &body.password)
    else {
        return api_error(StatusCode::UNAUTHORIZED, "unauthorized", "invalid credentials")
            .into_response();
    };

    with_cookie(
        Json(json!({ "success": true })).into_response(),
        session_cookie(token),
    )
}

pub async fn admin_logout_handler(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> Response {
    state.sessions.logout(&session.token);

    let mut cleared = session_cookie(String::new());
    cleared.set_max_age(CookieDuration::ZERO);
    with_cookie(
        Json(json!({ "success": true })).into_response(),
        cleared,
    )
}
