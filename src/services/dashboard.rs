use chrono::{Duration, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{booking::BookingWithNames, class::ClassRecord};
use crate::services::billing::{self, BillingService};

/// Everything the teacher's landing view renders, assembled from one
/// snapshot per request.
#[derive(Debug, Serialize)]
pub struct TeacherDashboard {
    pub today_classes: Vec<ClassRecord>,
    pub upcoming_week_count: i64,
    pub active_students: i64,
    pub unpaid_classes: i64,
    pub pending_revenue: f64,
    pub recent_bookings: Vec<BookingWithNames>,
}

pub struct DashboardService;

impl DashboardService {
    pub async fn overview(pool: &PgPool, teacher_id: Uuid) -> anyhow::Result<TeacherDashboard> {
        let today = Utc::now().date_naive();
        let week_end = today + Duration::days(7);

        let today_classes = sqlx::query_as::<_, ClassRecord>(
            "SELECT * FROM classes
             WHERE teacher_id = $1 AND date = $2
             ORDER BY time NULLS LAST",
        )
        .bind(teacher_id)
        .bind(today)
        .fetch_all(pool)
        .await?;

        let upcoming_week_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM classes
             WHERE teacher_id = $1 AND date > $2 AND date <= $3",
        )
        .bind(teacher_id)
        .bind(today)
        .bind(week_end)
        .fetch_one(pool)
        .await?;

        let active_students: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)::BIGINT FROM students
             WHERE teacher_id = $1 AND status = 'active'",
        )
        .bind(teacher_id)
        .fetch_one(pool)
        .await?;

        // Pending revenue comes from the same aggregation the billing view
        // uses, so the two screens can never disagree.
        let billed = BillingService::billed_classes(pool, teacher_id).await?;
        let summary = billing::aggregate(&billed);
        let unpaid_classes = summary
            .pending
            .iter()
            .map(|g| g.classes.len() as i64)
            .sum();
        let pending_revenue = summary.pending.iter().map(|g| g.total_amount).sum();

        let recent_bookings = sqlx::query_as::<_, BookingWithNames>(
            "SELECT b.id, b.student_user_id, b.teacher_id,
                    s.first_name || ' ' || s.last_name AS student_name,
                    t.first_name || ' ' || t.last_name AS teacher_name,
                    b.scheduled_at, b.duration_minutes, b.status, b.price, b.created_at
             FROM bookings b
             JOIN users s ON s.id = b.student_user_id
             JOIN users t ON t.id = b.teacher_id
             WHERE b.teacher_id = $1
             ORDER BY b.created_at DESC
             LIMIT 5",
        )
        .bind(teacher_id)
        .fetch_all(pool)
        .await?;

        Ok(TeacherDashboard {
            today_classes,
            upcoming_week_count,
            active_students,
            unpaid_classes,
            pending_revenue,
            recent_bookings,
        })
    }
}
