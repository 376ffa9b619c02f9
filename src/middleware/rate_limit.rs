use axum::{http::StatusCode, Json};
use serde_json::json;

/// Login attempts per email within the window.
pub const LOGIN_MAX_ATTEMPTS: u64 = 10;
pub const LOGIN_WINDOW_SECS: u64 = 600;

/// Password-reset requests per email within the window.
pub const RESET_MAX_ATTEMPTS: u64 = 5;
pub const RESET_WINDOW_SECS: u64 = 3600;

/// Checks an attempt counter stored in Redis under `key`.
///
/// Uses the INCR + EXPIRE strategy:
/// - Increments a counter for `key`
/// - On first increment, sets TTL to `window_secs`
/// - Returns 429 if counter exceeds `max_attempts`
/// - Redis errors fail open (the count falls back to 0)
pub async fn check_rate_limit(
    redis: &mut redis::aio::MultiplexedConnection,
    key: &str,
    max_attempts: u64,
    window_secs: u64,
) -> Result<(), (StatusCode, Json<serde_json::Value>)> {
    let count: u64 = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(0);

    if count == 1 {
        // Set TTL only on first increment to avoid resetting the window on each attempt
        let _: Result<(), _> = redis::cmd("EXPIRE")
            .arg(key)
            .arg(window_secs)
            .query_async(redis)
            .await;
    }

    if count > max_attempts {
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many attempts. Try again in a few minutes." })),
        ));
    }

    Ok(())
}
