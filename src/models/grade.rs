use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub title: String,
    pub score: f64,
    pub max_score: f64,
    pub comment: Option<String>,
    pub date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateGradeRequest {
    pub title: String,
    pub score: f64,
    pub max_score: Option<f64>,
    pub comment: Option<String>,
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGradeRequest {
    pub title: Option<String>,
    pub score: Option<f64>,
    pub max_score: Option<f64>,
    pub comment: Option<String>,
    pub date: Option<NaiveDate>,
}
