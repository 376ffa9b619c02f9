use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        grade::{CreateGradeRequest, UpdateGradeRequest},
    },
    routes::require_teacher,
    services::{grades::GradeService, students::StudentService},
    AppState,
};

/// GET /students/{id}/grades
pub async fn list_grades(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    GradeService::list_for_student(&state.db, user.user_id, student_id)
        .await
        .map(|grades| Json(serde_json::to_value(grades).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /students/{id}/grades
pub async fn create_grade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(student_id): Path<Uuid>,
    Json(body): Json<CreateGradeRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if body.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A grade title is required" })),
        ));
    }
    if body.max_score.is_some_and(|m| m <= 0.0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Maximum score must be positive" })),
        ));
    }

    let student = StudentService::get(&state.db, user.user_id, student_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;
    if student.is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Student not found" })),
        ));
    }

    GradeService::create(&state.db, user.user_id, student_id, &body)
        .await
        .map(|grade| (StatusCode::CREATED, Json(serde_json::to_value(grade).unwrap())))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// PUT /grades/{id}
pub async fn update_grade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGradeRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let grade = GradeService::update(&state.db, user.user_id, id, &body)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match grade {
        Some(g) => Ok(Json(serde_json::to_value(g).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Grade not found" })),
        )),
    }
}

/// DELETE /grades/{id}
pub async fn delete_grade(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let deleted = GradeService::delete(&state.db, user.user_id, id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if deleted {
        Ok(Json(json!({ "message": "Grade removed" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Grade not found" })),
        ))
    }
}
