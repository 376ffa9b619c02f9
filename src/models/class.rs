use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Applied when a class is stored without an explicit duration.
pub const DEFAULT_CLASS_DURATION_MIN: i32 = 60;

/// One scheduled lesson on a teacher's calendar.
/// `time` and `duration_minutes` are optional — rows missing either are
/// ignored by the conflict detector instead of raising an error.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassRecord {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub duration_minutes: Option<i32>,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for POST /classes. `time` is "HH:MM"; parsed and validated before
/// any store call.
#[derive(Debug, Deserialize)]
pub struct CreateClassRequest {
    pub student_id: Uuid,
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub duration_minutes: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateClassRequest {
    pub student_id: Option<Uuid>,
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub duration_minutes: Option<i32>,
}

/// Query params for GET /classes (inclusive date range).
#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}
