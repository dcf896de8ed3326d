use axum::{
    Router,
    routing::{get, post},
};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::{
    admin::AdminApi, attendance::AttendanceApi, auth::AuthApi, gate::RequireLayer, health,
    identity::AuthLayer, state::AppState,
};

pub fn routes() -> Router<AppState> {
    let member = Router::new()
        .route("/auth/me", get(AuthApi::me))
        .route("/attendance/clock-in", post(AttendanceApi::clock_in))
        .route("/attendance/clock-out", post(AttendanceApi::clock_out))
        .route("/attendance/break-start", post(AttendanceApi::break_start))
        .route("/attendance/break-end", post(AttendanceApi::break_end))
        .route("/attendance/status", get(AttendanceApi::status))
        .route("/attendance/records", get(AttendanceApi::records))
        .route_layer(RequireLayer::authenticated());

    let admin = Router::new()
        .route("/admin/users", get(AdminApi::users))
        .route("/admin/attendance", get(AdminApi::attendance))
        .route("/admin/users/{id}/attendance", get(AdminApi::user_attendance))
        .route("/admin/users/{id}/promote", post(AdminApi::promote))
        .route_layer(RequireLayer::admin());

    Router::new()
        .route("/auth/register", post(AuthApi::register))
        .route("/auth/login", post(AuthApi::login))
        .route("/auth/logout", post(AuthApi::logout))
        .merge(member)
        .merge(admin)
        .route("/live", get(health::live))
        .route("/ready", get(health::ready))
}

/// The complete service: routes under `/api`, identity resolution, and the
/// session cookie backed by `session_store`.
pub fn build_router<Store>(state: AppState, session_store: Store) -> Router
where
    Store: SessionStore + Clone,
{
    let session = &state.settings.session;
    let session_layer = SessionManagerLayer::new(session_store)
        .with_name(session.cookie_name.clone())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_secure(session.secure)
        .with_expiry(Expiry::OnInactivity(Duration::hours(session.expiry_hours)));

    Router::new()
        .nest("/api", routes())
        .layer(TraceLayer::new_for_http())
        .layer(AuthLayer::new())
        .layer(session_layer)
        .with_state(state)
}
