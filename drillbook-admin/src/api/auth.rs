//! Admin authorization middleware
//!
//! The identity provider in front of this service yields an opaque user ID,
//! forwarded here as the `x-admin-uid` header. The middleware consults the
//! role-lookup document for that ID; only the literal `admin` role passes.

use crate::api::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use tracing::{error, warn};

pub const ADMIN_UID_HEADER: &str = "x-admin-uid";

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let uid = request
        .headers()
        .get(ADMIN_UID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(uid) = uid else {
        return unauthorized("missing x-admin-uid header");
    };

    match state.store.is_admin(&uid).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            warn!("Rejected non-admin caller {}", uid);
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": "admin role required" })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Admin role lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "role lookup failed" })),
            )
                .into_response()
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
}
