/// Purge expired data based on retention policy
/// Run daily (e.g., via cron job: 0 2 * * * /app/purge-data)
///
/// Usage: purge-data [--booking-retention-days N]

use clap::Parser;
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "purge-data", about = "Purge expired data from the tutorspace database")]
struct Args {
    /// Cancelled bookings older than this many days are removed
    #[arg(long, default_value_t = 90)]
    booking_retention_days: i32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL environment variable not set");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Starting data purge job...");

    let tokens = sqlx::query(
        "DELETE FROM refresh_tokens WHERE revoked = TRUE OR expires_at < NOW()",
    )
    .execute(&pool)
    .await?
    .rows_affected();
    tracing::info!("Removed {} stale refresh tokens", tokens);

    let resets = sqlx::query(
        "DELETE FROM password_reset_tokens WHERE used = TRUE OR expires_at < NOW()",
    )
    .execute(&pool)
    .await?
    .rows_affected();
    tracing::info!("Removed {} stale password reset tokens", resets);

    let bookings = sqlx::query(
        "DELETE FROM bookings
         WHERE status = 'cancelled'
           AND updated_at < NOW() - make_interval(days => $1::INT)",
    )
    .bind(args.booking_retention_days)
    .execute(&pool)
    .await?
    .rows_affected();
    tracing::info!("Removed {} old cancelled bookings", bookings);

    tracing::info!("Data purge job completed");

    Ok(())
}
