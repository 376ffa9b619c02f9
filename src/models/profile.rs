use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Marketplace listing card owned by a teacher user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherProfile {
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub subject: Option<String>,
    pub city: Option<String>,
    pub hourly_rate: Option<f64>,
    pub is_listed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub subject: Option<String>,
    pub city: Option<String>,
    pub hourly_rate: Option<f64>,
    pub is_listed: Option<bool>,
}

/// One marketplace search result.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TeacherListing {
    pub user_id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub headline: Option<String>,
    pub subject: Option<String>,
    pub city: Option<String>,
    pub hourly_rate: Option<f64>,
    pub avg_rating: Option<f64>,
    pub review_count: i64,
}

/// Query params for GET /marketplace/teachers.
#[derive(Debug, Deserialize)]
pub struct MarketplaceQuery {
    pub subject: Option<String>,
    pub city: Option<String>,
    pub max_rate: Option<f64>,
}
