use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    billing::DEFAULT_HOURLY_RATE,
    booking::{Booking, BookingStatus, BookingWithNames},
    class::DEFAULT_CLASS_DURATION_MIN,
    user::UserRole,
};
use crate::services::schedule;

/// Outcome of a booking attempt. Only `Booked` writes anything.
pub enum BookingOutcome {
    Booked(Booking),
    Conflict,
    PastMidnight,
    TeacherUnavailable,
}

pub enum TransitionOutcome {
    Updated(Booking),
    Forbidden,
    InvalidState,
}

pub struct BookingService;

impl BookingService {
    /// Books a slot with a listed teacher. The slot is checked against the
    /// teacher's other active bookings that day before anything is written;
    /// the price is one per-booking charge at the teacher's rate.
    pub async fn create(
        pool: &PgPool,
        student_user_id: Uuid,
        teacher_id: Uuid,
        scheduled_at: DateTime<Utc>,
        duration_minutes: Option<i32>,
    ) -> anyhow::Result<BookingOutcome> {
        let rate: Option<Option<f64>> = sqlx::query_scalar(
            "SELECT hourly_rate FROM teacher_profiles
             WHERE user_id = $1 AND is_listed = TRUE",
        )
        .bind(teacher_id)
        .fetch_optional(pool)
        .await?;
        let Some(rate) = rate else {
            return Ok(BookingOutcome::TeacherUnavailable);
        };

        let duration = duration_minutes.unwrap_or(DEFAULT_CLASS_DURATION_MIN);
        let start = scheduled_at.time();
        if schedule::crosses_midnight(start, duration) {
            return Ok(BookingOutcome::PastMidnight);
        }

        // Same-day active bookings are the comparison set; cancelled and
        // completed ones release their slot.
        let existing: Vec<(Uuid, DateTime<Utc>, i32)> = sqlx::query_as(
            "SELECT id, scheduled_at, duration_minutes FROM bookings
             WHERE teacher_id = $1
               AND scheduled_at::DATE = $2::DATE
               AND status IN ('pending', 'confirmed')",
        )
        .bind(teacher_id)
        .bind(scheduled_at)
        .fetch_all(pool)
        .await?;

        let slots = existing
            .into_iter()
            .map(|(id, at, dur)| (id, Some(at.time()), Some(dur)));
        if schedule::find_conflict(start, duration, slots, None).is_some() {
            return Ok(BookingOutcome::Conflict);
        }

        let booking = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (student_user_id, teacher_id, scheduled_at, duration_minutes, price)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(student_user_id)
        .bind(teacher_id)
        .bind(scheduled_at)
        .bind(duration)
        .bind(rate.unwrap_or(DEFAULT_HOURLY_RATE))
        .fetch_one(pool)
        .await?;

        Ok(BookingOutcome::Booked(booking))
    }

    /// A teacher sees bookings made with them; a student sees their own.
    pub async fn list_for(
        pool: &PgPool,
        user_id: Uuid,
        role: UserRole,
    ) -> anyhow::Result<Vec<BookingWithNames>> {
        let column = match role {
            UserRole::Teacher => "b.teacher_id",
            UserRole::Student => "b.student_user_id",
        };
        let bookings = sqlx::query_as::<_, BookingWithNames>(&format!(
            "SELECT b.id, b.student_user_id, b.teacher_id,
                    s.first_name || ' ' || s.last_name AS student_name,
                    t.first_name || ' ' || t.last_name AS teacher_name,
                    b.scheduled_at, b.duration_minutes, b.status, b.price, b.created_at
             FROM bookings b
             JOIN users s ON s.id = b.student_user_id
             JOIN users t ON t.id = b.teacher_id
             WHERE {column} = $1
             ORDER BY b.scheduled_at DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(bookings)
    }

    pub async fn get(pool: &PgPool, booking_id: Uuid) -> anyhow::Result<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(pool)
            .await?;
        Ok(booking)
    }

    /// Role-guarded status transition. Confirm/complete belong to the
    /// teacher; either party may cancel while the booking is still active.
    pub async fn transition(
        pool: &PgPool,
        booking_id: Uuid,
        actor_id: Uuid,
        target: BookingStatus,
    ) -> anyhow::Result<Option<TransitionOutcome>> {
        let Some(booking) = Self::get(pool, booking_id).await? else {
            return Ok(None);
        };
        let current: BookingStatus = booking
            .status
            .parse()
            .unwrap_or(BookingStatus::Pending);

        let allowed_actor = match target {
            BookingStatus::Confirmed | BookingStatus::Completed => actor_id == booking.teacher_id,
            BookingStatus::Cancelled => {
                actor_id == booking.teacher_id || actor_id == booking.student_user_id
            }
            BookingStatus::Pending => false,
        };
        if !allowed_actor {
            return Ok(Some(TransitionOutcome::Forbidden));
        }

        let valid_state = matches!(
            (current, target),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        );
        if !valid_state {
            return Ok(Some(TransitionOutcome::InvalidState));
        }

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(target.to_string())
        .bind(booking_id)
        .fetch_one(pool)
        .await?;

        Ok(Some(TransitionOutcome::Updated(updated)))
    }
}
