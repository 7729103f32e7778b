pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use http::{header, HeaderValue, Method};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::web::middleware::auth::require_admin;
use crate::web::routes::{attendance, auth, events, health, registrations, sheets_proxy, sync};
use crate::web::state::AppState;

pub fn router(state: AppState) -> Router {
    // Admin routes share one session layer
    let admin_routes = Router::new()
        .route("/admin/logout", post(auth::admin_logout_handler))
        .route(
            "/api/admin/events",
            get(events::admin_list_events_handler).post(events::create_event_handler),
        )
        .route(
            "/api/admin/events/:event_id",
            put(events::update_event_handler).delete(events::delete_event_handler),
        )
        .route(
            "/api/admin/events/:event_id/problems",
            post(events::create_problem_handler),
        )
        .route(
            "/api/admin/problems/:problem_id",
            put(events::update_problem_handler).delete(events::delete_problem_handler),
        )
        .route(
            "/api/admin/problems/:problem_id/sheet",
            post(sync::sync_problem_statement_handler),
        )
        .route(
            "/api/admin/events/:event_id/registrations",
            get(registrations::admin_list_registrations_handler),
        )
        .route(
            "/api/admin/registrations/:registration_id/lock",
            post(registrations::toggle_lock_handler),
        )
        .route(
            "/api/admin/registrations/:registration_id/sync",
            post(sync::append_registration_handler),
        )
        .route(
            "/api/admin/registrations/:registration_id/append-row",
            post(sync::append_registration_row_handler),
        )
        .route(
            "/api/admin/events/:event_id/spreadsheet",
            post(sync::ensure_spreadsheet_handler),
        )
        .route(
            "/api/admin/events/:event_id/sync",
            post(sync::sync_event_registrations_handler),
        )
        .route(
            "/api/admin/events/:event_id/export",
            post(sync::export_event_handler),
        )
        .route(
            "/api/admin/events/:event_id/attendance",
            get(attendance::event_attendance_handler),
        )
        .route("/api/admin/sync/bulk", post(sync::bulk_sync_handler))
        .route("/api/admin/sync/in-flight", get(sync::in_flight_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let sheets_proxy_routes = Router::new()
        .route(
            "/api/sheets",
            post(sheets_proxy::sheets_proxy_handler).options(sheets_proxy::sheets_preflight_handler),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        );

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/events", get(events::list_active_events_handler))
        .route("/api/events/:event_id", get(events::event_detail_handler))
        .route(
            "/api/events/:event_id/registrations",
            post(registrations::create_registration_handler),
        )
        .route(
            "/api/events/:event_id/registrations/:reg_code",
            put(registrations::update_registration_handler),
        )
        .route(
            "/api/registrations/:reg_code",
            get(registrations::registration_by_code_handler),
        )
        .route(
            "/api/registrations/:reg_code/attendance-link",
            get(registrations::attendance_link_handler),
        )
        .route(
            "/api/attendance/:reg_code",
            get(attendance::team_attendance_handler),
        )
        .route(
            "/api/attendance/:reg_code/toggle",
            post(attendance::toggle_attendance_handler),
        )
        .route("/admin/login", post(auth::admin_login_handler))
        .merge(sheets_proxy_routes)
        .merge(admin_routes)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
