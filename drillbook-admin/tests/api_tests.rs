//! Integration tests for the admin REST API
//!
//! Drives the router directly with `tower::ServiceExt::oneshot`; no socket.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use drillbook_admin::api::{self, AppState};
use drillbook_core::db::{init_database, CurriculumStore};
use drillbook_core::reference::{ReferenceResolver, RudimentCatalog};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const ADMIN_UID: &str = "admin-uid";

async fn setup() -> (Router, CurriculumStore, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("test.db")).await.unwrap();
    sqlx::query("INSERT INTO admins (uid, role) VALUES (?, 'admin')")
        .bind(ADMIN_UID)
        .execute(&pool)
        .await
        .unwrap();

    let store = CurriculumStore::new(pool);
    let app = api::create_router(AppState {
        store: store.clone(),
        resolver: ReferenceResolver::new(RudimentCatalog::compiled_default()),
    });
    (app, store, dir)
}

fn request(method: &str, uri: &str, uid: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(uid) = uid {
        builder = builder.header("x-admin-uid", uid);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_needs_no_auth() {
    let (app, _store, _dir) = setup().await;
    let response = app
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_uid_is_unauthorized() {
    let (app, _store, _dir) = setup().await;
    let response = app
        .oneshot(request("GET", "/api/v1/courses", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_admin_uid_is_forbidden() {
    let (app, store, _dir) = setup().await;
    sqlx::query("INSERT INTO admins (uid, role) VALUES ('viewer-uid', 'viewer')")
        .execute(store.pool())
        .await
        .unwrap();

    for uid in ["viewer-uid", "nobody"] {
        let response = app
            .clone()
            .oneshot(request("GET", "/api/v1/courses", Some(uid), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "uid {}", uid);
    }
}

#[tokio::test]
async fn course_crud_over_http() {
    let (app, _store, _dir) = setup().await;

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/courses",
            Some(ADMIN_UID),
            Some(json!({ "title": "Rudiment Basics" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    let course_id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["order"], json!(0));

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            &format!("/api/v1/courses/{}", course_id),
            Some(ADMIN_UID),
            Some(json!({ "description": "Start here" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = json_body(response).await;
    assert_eq!(updated["title"], json!("Rudiment Basics"));
    assert_eq!(updated["description"], json!("Start here"));

    let response = app
        .clone()
        .oneshot(request(
            "DELETE",
            &format!("/api/v1/courses/{}", course_id),
            Some(ADMIN_UID),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/courses/{}", course_id),
            Some(ADMIN_UID),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn move_endpoint_swaps_adjacent_courses() {
    let (app, _store, _dir) = setup().await;

    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/api/v1/courses",
                Some(ADMIN_UID),
                Some(json!({ "title": title })),
            ))
            .await
            .unwrap();
        ids.push(json_body(response).await["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/api/v1/courses/{}/move", ids[1]),
            Some(ADMIN_UID),
            Some(json!({ "direction": "up" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let moved = json_body(response).await;
    let titles: Vec<&str> = moved
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["B", "A", "C"]);
}

#[tokio::test]
async fn lesson_reference_resolution_reports_dangling_as_null() {
    let (app, _store, _dir) = setup().await;

    // A rudiment to be referenced course-scoped
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/courses/c1/rudiments",
            Some(ADMIN_UID),
            Some(json!({ "name": "Singles", "pattern": ["L", "R"] })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let rudiment = json_body(response).await;
    let rudiment_id = rudiment["id"].as_str().unwrap();
    assert_eq!(rudiment["pattern"].as_array().unwrap().len(), 32);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/v1/courses/c1/lessons",
            Some(ADMIN_UID),
            Some(json!({
                "title": "Lesson",
                "rudimentIds": [
                    "paradiddle-1",
                    format!("course:c1:{}", rudiment_id),
                    "course:c1:deleted",
                ],
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let lesson_id = json_body(response).await["id"].as_str().unwrap().to_string();

    let response = app
        .oneshot(request(
            "GET",
            &format!("/api/v1/lessons/{}/rudiments", lesson_id),
            Some(ADMIN_UID),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let resolved = json_body(response).await;
    let entries = resolved.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["resolved"]["kind"], json!("catalog"));
    assert_eq!(entries[0]["resolved"]["label"], json!("Paradiddle"));
    assert_eq!(entries[1]["resolved"]["kind"], json!("courseScoped"));
    assert_eq!(entries[1]["resolved"]["rudiment"]["name"], json!("Singles"));
    assert_eq!(entries[2]["resolved"], json!(null));
}
