pub mod auth;
pub mod billing;
pub mod bookings;
pub mod classes;
pub mod dashboard;
pub mod geo;
pub mod grades;
pub mod health;
pub mod marketplace;
pub mod metrics;
pub mod profile;
pub mod students;

use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

use crate::models::{auth::AuthenticatedUser, user::UserRole};

/// CRM resources (roster, calendar, billing, grades) are teacher-only.
pub(crate) fn require_teacher(user: &AuthenticatedUser) -> Option<(StatusCode, Json<Value>)> {
    match user.role {
        UserRole::Teacher => None,
        _ => Some((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" })))),
    }
}

/// Booking and reviewing are done by student accounts.
pub(crate) fn require_student(user: &AuthenticatedUser) -> Option<(StatusCode, Json<Value>)> {
    match user.role {
        UserRole::Student => None,
        _ => Some((StatusCode::FORBIDDEN, Json(json!({ "error": "Access denied" })))),
    }
}
