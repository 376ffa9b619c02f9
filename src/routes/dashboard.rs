use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::{
    models::auth::AuthenticatedUser,
    routes::require_teacher,
    services::dashboard::DashboardService,
    AppState,
};

/// GET /dashboard — the teacher's landing view.
pub async fn overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    DashboardService::overview(&state.db, user.user_id)
        .await
        .map(|overview| Json(serde_json::to_value(overview).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
