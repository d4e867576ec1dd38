//! HTTP request handlers for curriculum CRUD, reordering, and reference
//! resolution

use crate::api::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use drillbook_core::model::{Course, CourseRudiment, Lesson};
use drillbook_core::ordering::MoveDirection;
use drillbook_core::pattern::{PatternCell, Subdivision};
use drillbook_core::reference::{ResolvedRudiment, RudimentRef};
use drillbook_core::schema::{
    CoursePatch, LessonPatch, NewCourse, NewLesson, NewRudiment, RudimentPatch,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

// ============================================================================
// Error mapping
// ============================================================================

/// Core error carried to an HTTP response: NotFound → 404, store I/O → 500
pub struct ApiError(drillbook_core::Error);

impl From<drillbook_core::Error> for ApiError {
    fn from(e: drillbook_core::Error) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn not_found(what: impl Into<String>) -> Self {
        ApiError(drillbook_core::Error::NotFound(what.into()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            drillbook_core::Error::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("not found: {}", what) })),
            )
                .into_response(),
            e => {
                error!("Request failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Reference strings; composite `course:<c>:<r>` refs parse on receipt
    #[serde(default)]
    pub rudiment_ids: Vec<RudimentRef>,
    pub suggested_bpm: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub order: Option<i64>,
    /// Always applied in full; an omitted field clears the references
    #[serde(default)]
    pub rudiment_ids: Vec<RudimentRef>,
    pub suggested_bpm: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRudimentRequest {
    pub name: String,
    #[serde(default)]
    pub pattern: Vec<PatternCell>,
    #[serde(default = "default_subdivision")]
    pub subdivision: Subdivision,
}

fn default_subdivision() -> Subdivision {
    Subdivision::Sixteenth
}

#[derive(Debug, Deserialize)]
pub struct UpdateRudimentRequest {
    pub name: Option<String>,
    pub pattern: Option<Vec<PatternCell>>,
    pub subdivision: Option<Subdivision>,
    pub order: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
}

/// One lesson reference with its resolution outcome; a dangling reference
/// reports `resolved: null` rather than failing the request
#[derive(Debug, Serialize)]
pub struct ResolvedReference {
    pub reference: String,
    pub resolved: Option<ResolvedRudiment>,
}

// ============================================================================
// Courses
// ============================================================================

pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Json<Vec<Course>>> {
    Ok(Json(state.store.list_courses().await?))
}

pub async fn create_course(
    State(state): State<AppState>,
    Json(req): Json<CreateCourseRequest>,
) -> ApiResult<(StatusCode, Json<Course>)> {
    let course = state
        .store
        .create_course(&NewCourse {
            title: req.title,
            description: req.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Course>> {
    let course = state
        .store
        .get_course(&course_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("course {}", course_id)))?;
    Ok(Json(course))
}

pub async fn update_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<UpdateCourseRequest>,
) -> ApiResult<Json<Course>> {
    let patch = CoursePatch {
        title: req.title,
        description: req.description,
        order: req.order,
    };
    Ok(Json(state.store.update_course(&course_id, &patch).await?))
}

pub async fn delete_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_course(&course_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_course(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Vec<Course>>> {
    let courses = state.store.list_courses().await?;
    let next = state
        .store
        .move_course(&courses, &course_id, req.direction)
        .await?;
    Ok(Json(next))
}

// ============================================================================
// Lessons
// ============================================================================

pub async fn list_lessons(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Vec<Lesson>>> {
    Ok(Json(state.store.list_lessons(&course_id).await?))
}

pub async fn create_lesson(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<CreateLessonRequest>,
) -> ApiResult<(StatusCode, Json<Lesson>)> {
    let lesson = state
        .store
        .create_lesson(&NewLesson {
            course_id,
            title: req.title,
            body: req.body,
            rudiment_refs: req.rudiment_ids,
            suggested_bpm: req.suggested_bpm,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

pub async fn get_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Json<Lesson>> {
    let lesson = state
        .store
        .get_lesson(&lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("lesson {}", lesson_id)))?;
    Ok(Json(lesson))
}

pub async fn update_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(req): Json<UpdateLessonRequest>,
) -> ApiResult<Json<Lesson>> {
    let patch = LessonPatch {
        title: req.title,
        body: req.body,
        order: req.order,
        rudiment_refs: req.rudiment_ids,
        suggested_bpm: req.suggested_bpm,
    };
    Ok(Json(state.store.update_lesson(&lesson_id, &patch).await?))
}

pub async fn delete_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_lesson(&lesson_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_lesson(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Vec<Lesson>>> {
    let lesson = state
        .store
        .get_lesson(&lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("lesson {}", lesson_id)))?;
    let lessons = state.store.list_lessons(&lesson.course_id).await?;
    let next = state
        .store
        .move_lesson(&lessons, &lesson_id, req.direction)
        .await?;
    Ok(Json(next))
}

/// Resolve a lesson's rudiment references to displayable data
pub async fn resolve_lesson_rudiments(
    State(state): State<AppState>,
    Path(lesson_id): Path<String>,
) -> ApiResult<Json<Vec<ResolvedReference>>> {
    let lesson = state
        .store
        .get_lesson(&lesson_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("lesson {}", lesson_id)))?;

    let mut resolved = Vec::with_capacity(lesson.rudiment_refs.len());
    for reference in &lesson.rudiment_refs {
        let outcome = state.resolver.resolve(&state.store, reference).await?;
        resolved.push(ResolvedReference {
            reference: reference.to_string(),
            resolved: outcome,
        });
    }
    Ok(Json(resolved))
}

// ============================================================================
// Course rudiments
// ============================================================================

pub async fn list_rudiments(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
) -> ApiResult<Json<Vec<CourseRudiment>>> {
    Ok(Json(state.store.list_rudiments(&course_id).await?))
}

pub async fn create_rudiment(
    State(state): State<AppState>,
    Path(course_id): Path<String>,
    Json(req): Json<CreateRudimentRequest>,
) -> ApiResult<(StatusCode, Json<CourseRudiment>)> {
    let rudiment = state
        .store
        .create_rudiment(
            &course_id,
            &NewRudiment {
                name: req.name,
                pattern: req.pattern,
                subdivision: req.subdivision,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(rudiment)))
}

pub async fn get_rudiment(
    State(state): State<AppState>,
    Path((course_id, rudiment_id)): Path<(String, String)>,
) -> ApiResult<Json<CourseRudiment>> {
    let rudiment = state
        .store
        .get_rudiment(&course_id, &rudiment_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("rudiment {}/{}", course_id, rudiment_id)))?;
    Ok(Json(rudiment))
}

pub async fn update_rudiment(
    State(state): State<AppState>,
    Path((course_id, rudiment_id)): Path<(String, String)>,
    Json(req): Json<UpdateRudimentRequest>,
) -> ApiResult<Json<CourseRudiment>> {
    let patch = RudimentPatch {
        name: req.name,
        pattern: req.pattern,
        subdivision: req.subdivision,
        order: req.order,
    };
    Ok(Json(
        state
            .store
            .update_rudiment(&course_id, &rudiment_id, &patch)
            .await?,
    ))
}

pub async fn delete_rudiment(
    State(state): State<AppState>,
    Path((course_id, rudiment_id)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state.store.delete_rudiment(&course_id, &rudiment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn move_rudiment(
    State(state): State<AppState>,
    Path((course_id, rudiment_id)): Path<(String, String)>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<Json<Vec<CourseRudiment>>> {
    let rudiments = state.store.list_rudiments(&course_id).await?;
    let next = state
        .store
        .move_rudiment(&course_id, &rudiments, &rudiment_id, req.direction)
        .await?;
    Ok(Json(next))
}
