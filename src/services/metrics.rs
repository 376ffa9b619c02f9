use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec, Counter,
    CounterVec, Gauge, GaugeVec,
};
use sqlx::PgPool;
use tracing::{info, warn};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref CLASSES_SCHEDULED_COUNTER: CounterVec = register_counter_vec!(
        "api_classes_scheduled_total",
        "Class create/update attempts by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref INVOICES_COUNTER: CounterVec = register_counter_vec!(
        "api_invoices_total",
        "Invoices produced by delivery channel",
        &["channel"]
    ).unwrap();

    pub static ref BOOKINGS_COUNTER: CounterVec = register_counter_vec!(
        "api_bookings_total",
        "Marketplace booking attempts by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref ROSTER_IMPORTS_COUNTER: Counter = register_counter!(
        "api_roster_imports_total",
        "Roster import runs"
    ).unwrap();

    // ── Business gauges (refreshed by the collector) ────────────────────────
    pub static ref USERS_GAUGE: GaugeVec = register_gauge_vec!(
        "tutorspace_users_total",
        "Active users by role",
        &["role"]
    ).unwrap();

    pub static ref STUDENTS_GAUGE: Gauge = register_gauge!(
        "tutorspace_students_active_total",
        "Active roster students across all teachers"
    ).unwrap();

    pub static ref UNPAID_CLASSES_GAUGE: Gauge = register_gauge!(
        "tutorspace_classes_unpaid_total",
        "Classes awaiting payment"
    ).unwrap();

    pub static ref PENDING_BOOKINGS_GAUGE: Gauge = register_gauge!(
        "tutorspace_bookings_pending_total",
        "Marketplace bookings awaiting confirmation"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        // Initial collection on startup
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let user_counts: Vec<(String, i64)> = sqlx::query_as(
        "SELECT role, COUNT(*)::BIGINT FROM users WHERE is_active = TRUE GROUP BY role",
    )
    .fetch_all(pool)
    .await
    .unwrap_or_default();
    for (role, count) in user_counts {
        USERS_GAUGE.with_label_values(&[&role]).set(count as f64);
    }

    let students: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM students WHERE status = 'active'")
            .fetch_one(pool)
            .await
            .unwrap_or(0);
    STUDENTS_GAUGE.set(students as f64);

    let unpaid: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM classes WHERE paid = FALSE")
            .fetch_one(pool)
            .await
            .unwrap_or(0);
    UNPAID_CLASSES_GAUGE.set(unpaid as f64);

    let pending: i64 =
        sqlx::query_scalar("SELECT COUNT(*)::BIGINT FROM bookings WHERE status = 'pending'")
            .fetch_one(pool)
            .await
            .unwrap_or(0);
    PENDING_BOOKINGS_GAUGE.set(pending as f64);

    info!("Metrics: business gauges refreshed");
    Ok(())
}
