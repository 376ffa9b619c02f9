use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Student {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub subject: Option<String>,
    /// Per-class charge for this student. NULL falls back to
    /// [`crate::models::billing::DEFAULT_HOURLY_RATE`].
    pub hourly_rate: Option<f64>,
    pub status: String, // "active" | "archived"
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: String,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub hourly_rate: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subject: Option<String>,
    pub hourly_rate: Option<f64>,
    pub status: Option<String>,
}

/// Query params for GET /students.
#[derive(Debug, Deserialize)]
pub struct StudentListQuery {
    pub status: Option<String>,
}

/// Result of a roster import (CSV/XLSX). Rows that fail to parse are
/// reported and skipped, never aborting the rows that did parse.
#[derive(Debug, Default, Serialize)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportRowError>,
}

#[derive(Debug, Serialize)]
pub struct ImportRowError {
    pub row: usize,
    pub message: String,
}
