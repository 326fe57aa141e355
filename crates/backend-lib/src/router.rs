// ============================
// crates/backend-lib/src/router.rs
// ============================
//! HTTP router.
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, data, session, work};
use crate::middleware::{client_ip, require_session};
use crate::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/", get(data::home))
        .route("/classes", get(data::classes))
        .route("/tasks", get(data::due_tasks))
        .route("/tasks/classes", get(data::class_tasks))
        .route("/tasks/{platform}/{id}", get(data::task))
        .route("/tasks/{platform}/{id}/submit", post(work::submit))
        .route("/tasks/{platform}/{id}/upload", post(work::upload))
        .route("/tasks/{platform}/{id}/remove", post(work::remove))
        .route("/grades", get(data::grades))
        .route("/res", get(data::resources))
        .route("/res/{platform}/{id}", get(data::resource))
        .route("/timetable", get(data::timetable))
        .route("/events", get(data::events))
        .route("/messages", get(data::messages))
        .route("/reports", get(data::reports))
        .route("/reauth", post(session::reauth))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", get(session::login_page))
        .route("/auth", post(session::login))
        .route("/logout", get(session::logout))
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), client_ip))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
