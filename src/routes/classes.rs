use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{
        auth::AuthenticatedUser,
        class::{CalendarQuery, CreateClassRequest, UpdateClassRequest},
    },
    routes::require_teacher,
    services::{
        metrics::CLASSES_SCHEDULED_COUNTER,
        schedule::{self, ScheduleOutcome, ScheduleService},
        students::StudentService,
    },
    AppState,
};

fn conflict_response() -> (StatusCode, Json<Value>) {
    (
        StatusCode::CONFLICT,
        Json(json!({ "error": "This time slot overlaps another class on that date" })),
    )
}

fn past_midnight_response() -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "A class may not extend past midnight" })),
    )
}

/// GET /classes?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn list_classes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<CalendarQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    ScheduleService::list(&state.db, user.user_id, params.from, params.to)
        .await
        .map(|classes| Json(serde_json::to_value(classes).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /classes — the conflict check runs before anything is written; a
/// conflicting slot answers 409 and writes nothing.
pub async fn create_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateClassRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if body.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A class title is required" })),
        ));
    }
    let Some(time) = schedule::parse_class_time(&body.time) else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid time — use HH:MM (e.g. 09:30)" })),
        ));
    };
    if body.duration_minutes.is_some_and(|d| d <= 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Duration must be a positive number of minutes" })),
        ));
    }

    // The roster row must exist and belong to this teacher.
    let student = StudentService::get(&state.db, user.user_id, body.student_id)
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

    let outcome = ScheduleService::create(
        &state.db,
        user.user_id,
        body.student_id,
        body.title.trim(),
        body.date,
        time,
        body.duration_minutes,
    )
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    match outcome {
        ScheduleOutcome::Scheduled(class) => {
            CLASSES_SCHEDULED_COUNTER
                .with_label_values(&["scheduled"])
                .inc();
            Ok((StatusCode::CREATED, Json(serde_json::to_value(class).unwrap())))
        }
        ScheduleOutcome::Conflict => {
            CLASSES_SCHEDULED_COUNTER
                .with_label_values(&["conflict"])
                .inc();
            Err(conflict_response())
        }
        ScheduleOutcome::PastMidnight => Err(past_midnight_response()),
    }
}

/// PUT /classes/{id} — rescheduling re-runs the conflict check with the
/// class itself excluded from the comparison set.
pub async fn update_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClassRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let time = match &body.time {
        Some(raw) => match schedule::parse_class_time(raw) {
            Some(t) => Some(t),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": "Invalid time — use HH:MM (e.g. 09:30)" })),
                ))
            }
        },
        None => None,
    };
    if body.duration_minutes.is_some_and(|d| d <= 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Duration must be a positive number of minutes" })),
        ));
    }

    let outcome = ScheduleService::update(
        &state.db,
        user.user_id,
        id,
        body.student_id,
        body.title.as_deref(),
        body.date,
        time,
        body.duration_minutes,
    )
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    })?;

    match outcome {
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Class not found" })),
        )),
        Some(ScheduleOutcome::Scheduled(class)) => {
            Ok(Json(serde_json::to_value(class).unwrap()))
        }
        Some(ScheduleOutcome::Conflict) => {
            CLASSES_SCHEDULED_COUNTER
                .with_label_values(&["conflict"])
                .inc();
            Err(conflict_response())
        }
        Some(ScheduleOutcome::PastMidnight) => Err(past_midnight_response()),
    }
}

/// DELETE /classes/{id}
pub async fn delete_class(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let deleted = ScheduleService::delete(&state.db, user.user_id, id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    if deleted {
        Ok(Json(json!({ "message": "Class removed" })))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Class not found" })),
        ))
    }
}
