//! REST API for the curriculum admin service

pub mod auth;
pub mod handlers;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use drillbook_core::db::CurriculumStore;
use drillbook_core::reference::ReferenceResolver;
use serde_json::json;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: CurriculumStore,
    pub resolver: ReferenceResolver,
}

/// Create the API router.
///
/// Everything under `/api/v1` requires an admin caller (see
/// [`auth::require_admin`]); `/health` does not.
pub fn create_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        // Courses
        .route("/courses", get(handlers::list_courses).post(handlers::create_course))
        .route(
            "/courses/:course_id",
            get(handlers::get_course)
                .put(handlers::update_course)
                .delete(handlers::delete_course),
        )
        .route("/courses/:course_id/move", post(handlers::move_course))

        // Lessons (listed/created per course, addressed globally)
        .route(
            "/courses/:course_id/lessons",
            get(handlers::list_lessons).post(handlers::create_lesson),
        )
        .route(
            "/lessons/:lesson_id",
            get(handlers::get_lesson)
                .put(handlers::update_lesson)
                .delete(handlers::delete_lesson),
        )
        .route("/lessons/:lesson_id/move", post(handlers::move_lesson))
        .route("/lessons/:lesson_id/rudiments", get(handlers::resolve_lesson_rudiments))

        // Course rudiments (nested sub-scope)
        .route(
            "/courses/:course_id/rudiments",
            get(handlers::list_rudiments).post(handlers::create_rudiment),
        )
        .route(
            "/courses/:course_id/rudiments/:rudiment_id",
            get(handlers::get_rudiment)
                .put(handlers::update_rudiment)
                .delete(handlers::delete_rudiment),
        )
        .route(
            "/courses/:course_id/rudiments/:rudiment_id/move",
            post(handlers::move_rudiment),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_admin));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", admin_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(_state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "drillbook-admin",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
