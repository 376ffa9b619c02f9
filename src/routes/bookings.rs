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
        booking::{BookingStatus, CreateBookingRequest},
        review::CreateReviewRequest,
    },
    routes::require_student,
    services::{
        bookings::{BookingOutcome, BookingService, TransitionOutcome},
        metrics::BOOKINGS_COUNTER,
        reviews::ReviewService,
    },
    AppState,
};

/// POST /bookings — a student books a listed teacher. The slot is checked
/// against the teacher's active bookings before anything is written.
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = require_student(&user) {
        return Err(err);
    }
    if body.duration_minutes.is_some_and(|d| d <= 0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Duration must be a positive number of minutes" })),
        ));
    }

    let outcome = BookingService::create(
        &state.db,
        user.user_id,
        body.teacher_id,
        body.scheduled_at,
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
        BookingOutcome::Booked(booking) => {
            BOOKINGS_COUNTER.with_label_values(&["booked"]).inc();
            Ok((
                StatusCode::CREATED,
                Json(serde_json::to_value(booking).unwrap()),
            ))
        }
        BookingOutcome::Conflict => {
            BOOKINGS_COUNTER.with_label_values(&["conflict"]).inc();
            Err((
                StatusCode::CONFLICT,
                Json(json!({ "error": "The teacher already has a booking in that time slot" })),
            ))
        }
        BookingOutcome::PastMidnight => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "A booking may not extend past midnight" })),
        )),
        BookingOutcome::TeacherUnavailable => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "This teacher is not accepting bookings" })),
        )),
    }
}

/// GET /bookings — own bookings; which side depends on the caller's role.
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    BookingService::list_for(&state.db, user.user_id, user.role)
        .await
        .map(|bookings| Json(serde_json::to_value(bookings).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

async fn transition(
    state: &AppState,
    user: &AuthenticatedUser,
    booking_id: Uuid,
    target: BookingStatus,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let outcome = BookingService::transition(&state.db, booking_id, user.user_id, target)
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
            Json(json!({ "error": "Booking not found" })),
        )),
        Some(TransitionOutcome::Forbidden) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Access denied" })),
        )),
        Some(TransitionOutcome::InvalidState) => Err((
            StatusCode::CONFLICT,
            Json(json!({ "error": "The booking is not in a state that allows this" })),
        )),
        Some(TransitionOutcome::Updated(booking)) => {
            Ok(Json(serde_json::to_value(booking).unwrap()))
        }
    }
}

/// POST /bookings/{id}/confirm — teacher accepts.
pub async fn confirm_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    transition(&state, &user, id, BookingStatus::Confirmed).await
}

/// POST /bookings/{id}/cancel — either party backs out.
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    transition(&state, &user, id, BookingStatus::Cancelled).await
}

/// POST /bookings/{id}/complete — teacher marks the lesson as held.
pub async fn complete_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    transition(&state, &user, id, BookingStatus::Completed).await
}

/// POST /bookings/{id}/review — student reviews a completed booking.
pub async fn review_booking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    if let Some(err) = require_student(&user) {
        return Err(err);
    }
    let Some(rating) = body.rating else {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Please select a rating" })),
        ));
    };
    if !(1..=5).contains(&rating) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Rating must be between 1 and 5" })),
        ));
    }

    let review = ReviewService::create(&state.db, user.user_id, id, rating, body.comment.as_deref())
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match review {
        Some(r) => Ok((StatusCode::CREATED, Json(serde_json::to_value(r).unwrap()))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No booking to review" })),
        )),
    }
}
