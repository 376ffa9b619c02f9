use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    models::{auth::AuthenticatedUser, profile::MarketplaceQuery},
    services::marketplace::MarketplaceService,
    AppState,
};

/// GET /marketplace/teachers?subject=&city=&max_rate=
pub async fn list_teachers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(params): Query<MarketplaceQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    MarketplaceService::list(&state.db, &params)
        .await
        .map(|teachers| Json(serde_json::to_value(teachers).unwrap()))
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        })
}

/// GET /marketplace/teachers/{id} — profile card plus reviews.
pub async fn teacher_detail(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let internal = |e: anyhow::Error| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
    };

    let Some(listing) = MarketplaceService::detail(&state.db, id)
        .await
        .map_err(internal)?
    else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Profile not found" })),
        ));
    };

    let reviews = MarketplaceService::reviews(&state.db, id)
        .await
        .map_err(internal)?;

    Ok(Json(json!({ "teacher": listing, "reviews": reviews })))
}
