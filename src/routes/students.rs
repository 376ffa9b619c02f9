use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        student::{CreateStudentRequest, StudentListQuery, UpdateStudentRequest},
    },
    routes::require_teacher,
    services::{
        billing::{self, BillingService},
        grades::GradeService,
        metrics::ROSTER_IMPORTS_COUNTER,
        schedule::ScheduleService,
        students::StudentService,
    },
    AppState,
};

pub async fn list_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<StudentListQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    StudentService::list(&state.db, user.user_id, params.status.as_deref())
        .await
        .map(|students| Json(serde_json::to_value(students).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

pub async fn create_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if body.name.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A student name is required" })),
        ));
    }
    if body.hourly_rate.is_some_and(|r| r < 0.0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Hourly rate cannot be negative" })),
        ));
    }

    StudentService::create(&state.db, user.user_id, &body)
        .await
        .map(|student| (StatusCode::CREATED, Json(serde_json::to_value(student).unwrap())))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

pub async fn get_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let student = StudentService::get(&state.db, user.user_id, id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match student {
        Some(s) => Ok(Json(serde_json::to_value(s).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Student not found" })),
        )),
    }
}

pub async fn update_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStudentRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if let Some(status) = &body.status {
        if status != "active" && status != "archived" {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Status must be 'active' or 'archived'" })),
            ));
        }
    }

    let student = StudentService::update(&state.db, user.user_id, id, &body)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match student {
        Some(s) => Ok(Json(serde_json::to_value(s).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Student not found" })),
        )),
    }
}

pub async fn delete_student(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let deleted = StudentService::delete(&state.db, user.user_id, id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if deleted {
        Ok(Json(json!({ "message": "Student removed" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Student not found" })),
        ))
    }
}

/// GET /students/{id}/dashboard — the per-student view: upcoming classes,
/// grades, and this student's pending/history billing groups.
pub async fn student_dashboard(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let internal = |e: anyhow::Error| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    };

    let Some(student) = StudentService::get(&state.db, user.user_id, id)
        .await
        .map_err(internal)?
    else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Student not found" })),
        ));
    };

    let today = Utc::now().date_naive();
    let upcoming = ScheduleService::upcoming_for_student(&state.db, user.user_id, id, today)
        .await
        .map_err(internal)?;
    let grades = GradeService::list_for_student(&state.db, user.user_id, id)
        .await
        .map_err(internal)?;
    let average = GradeService::average_percent(&grades);

    let billed = BillingService::billed_classes_for_student(&state.db, user.user_id, id)
        .await
        .map_err(internal)?;
    let billing = billing::aggregate(&billed);

    Ok(Json(json!({
        "student": student,
        "upcoming_classes": upcoming,
        "grades": grades,
        "grade_average": average,
        "billing": billing,
    })))
}

/// POST /students/import — multipart CSV or XLSX roster upload.
pub async fn import_students(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
    })? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("roster.csv").to_string();
            let bytes = field.bytes().await.map_err(|e| {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "No file field in upload" })),
        ));
    };

    let report = StudentService::import(&state.db, user.user_id, &filename, &bytes)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    ROSTER_IMPORTS_COUNTER.inc();
    Ok(Json(serde_json::to_value(report).unwrap()))
}
