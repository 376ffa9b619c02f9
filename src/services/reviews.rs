use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    booking::BookingStatus,
    review::Review,
};
use crate::services::bookings::BookingService;

pub struct ReviewService;

impl ReviewService {
    /// One review per completed booking, written by the student who booked.
    /// Returns None when there is no such booking for this student —
    /// "no teacher to review" is a state, not a failure.
    pub async fn create(
        pool: &PgPool,
        student_user_id: Uuid,
        booking_id: Uuid,
        rating: i16,
        comment: Option<&str>,
    ) -> anyhow::Result<Option<Review>> {
        let Some(booking) = BookingService::get(pool, booking_id).await? else {
            return Ok(None);
        };
        if booking.student_user_id != student_user_id {
            return Ok(None);
        }

        let status: BookingStatus = booking.status.parse().unwrap_or(BookingStatus::Pending);
        if status != BookingStatus::Completed {
            anyhow::bail!("Only completed bookings can be reviewed");
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM reviews WHERE booking_id = $1)")
                .bind(booking_id)
                .fetch_one(pool)
                .await?;
        if exists {
            anyhow::bail!("This booking has already been reviewed");
        }

        let review = sqlx::query_as::<_, Review>(
            "INSERT INTO reviews (booking_id, teacher_id, student_user_id, rating, comment)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(booking_id)
        .bind(booking.teacher_id)
        .bind(student_user_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(pool)
        .await?;

        Ok(Some(review))
    }
}
