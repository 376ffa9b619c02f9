use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    models::{auth::AuthenticatedUser, profile::UpdateProfileRequest},
    routes::require_teacher,
    services::profile::ProfileService,
    AppState,
};

/// GET /profile — the teacher's settings/marketplace card.
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    let profile = ProfileService::get(&state.db, user.user_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })?;

    match profile {
        Some(p) => Ok(Json(serde_json::to_value(p).unwrap())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Profile not found" })),
        )),
    }
}

/// PUT /profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }
    if body.hourly_rate.is_some_and(|r| r < 0.0) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Hourly rate cannot be negative" })),
        ));
    }
    // A listing without a subject is unfindable — refuse the toggle, not the save.
    if body.is_listed == Some(true)
        && body.subject.as_deref().map_or(true, |s| s.trim().is_empty())
    {
        let current = ProfileService::get(&state.db, user.user_id)
            .await
            .map_err(|e| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
            })?;
        let has_subject = current
            .as_ref()
            .and_then(|p| p.subject.as_deref())
            .map_or(false, |s| !s.trim().is_empty());
        if !has_subject {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Add a subject before listing your profile" })),
            ));
        }
    }

    ProfileService::update(&state.db, user.user_id, &body)
        .await
        .map(|profile| Json(serde_json::to_value(profile).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// POST /profile/avatar — multipart image upload.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if let Some(err) = require_teacher(&user) {
        return Err(err);
    }

    ProfileService::upload_avatar(&state.db, user.user_id, &state.config.media_dir, multipart)
        .await
        .map(|url| Json(json!({ "avatar_url": url })))
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        })
}
