use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    profile::{MarketplaceQuery, TeacherListing},
    review::ReviewWithAuthor,
};

pub struct MarketplaceService;

impl MarketplaceService {
    /// Listed teachers matching the optional subject/city/rate filters, with
    /// their review aggregate. An empty result is a normal empty list.
    pub async fn list(pool: &PgPool, q: &MarketplaceQuery) -> anyhow::Result<Vec<TeacherListing>> {
        let subject = q.subject.as_ref().map(|s| format!("%{s}%"));
        let city = q.city.as_ref().map(|s| format!("%{s}%"));

        let listings = sqlx::query_as::<_, TeacherListing>(
            "SELECT p.user_id,
                    u.first_name || ' ' || u.last_name AS name,
                    u.avatar_url, p.headline, p.subject, p.city, p.hourly_rate,
                    AVG(r.rating)::FLOAT8 AS avg_rating,
                    COUNT(r.id) AS review_count
             FROM teacher_profiles p
             JOIN users u ON u.id = p.user_id AND u.is_active = TRUE
             LEFT JOIN reviews r ON r.teacher_id = p.user_id
             WHERE p.is_listed = TRUE
               AND ($1::TEXT IS NULL OR p.subject ILIKE $1)
               AND ($2::TEXT IS NULL OR p.city ILIKE $2)
               AND ($3::FLOAT8 IS NULL OR p.hourly_rate <= $3)
             GROUP BY p.user_id, u.first_name, u.last_name, u.avatar_url,
                      p.headline, p.subject, p.city, p.hourly_rate
             ORDER BY name",
        )
        .bind(subject)
        .bind(city)
        .bind(q.max_rate)
        .fetch_all(pool)
        .await?;
        Ok(listings)
    }

    /// One listed teacher's card, or None — "profile not found" is a state,
    /// not an error.
    pub async fn detail(
        pool: &PgPool,
        teacher_id: Uuid,
    ) -> anyhow::Result<Option<TeacherListing>> {
        let listing = sqlx::query_as::<_, TeacherListing>(
            "SELECT p.user_id,
                    u.first_name || ' ' || u.last_name AS name,
                    u.avatar_url, p.headline, p.subject, p.city, p.hourly_rate,
                    AVG(r.rating)::FLOAT8 AS avg_rating,
                    COUNT(r.id) AS review_count
             FROM teacher_profiles p
             JOIN users u ON u.id = p.user_id AND u.is_active = TRUE
             LEFT JOIN reviews r ON r.teacher_id = p.user_id
             WHERE p.user_id = $1 AND p.is_listed = TRUE
             GROUP BY p.user_id, u.first_name, u.last_name, u.avatar_url,
                      p.headline, p.subject, p.city, p.hourly_rate",
        )
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        Ok(listing)
    }

    pub async fn reviews(
        pool: &PgPool,
        teacher_id: Uuid,
    ) -> anyhow::Result<Vec<ReviewWithAuthor>> {
        let reviews = sqlx::query_as::<_, ReviewWithAuthor>(
            "SELECT r.id, r.rating, r.comment,
                    u.first_name || ' ' || u.last_name AS author_name,
                    r.created_at
             FROM reviews r
             JOIN users u ON u.id = r.student_user_id
             WHERE r.teacher_id = $1
             ORDER BY r.created_at DESC",
        )
        .bind(teacher_id)
        .fetch_all(pool)
        .await?;
        Ok(reviews)
    }
}
