use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{models::geo::CityQuery, AppState};

/// GET /geo/cities?q= — city autocomplete for the profile form. Queries
/// shorter than two characters answer an empty list without calling out.
pub async fn search_cities(
    State(state): State<AppState>,
    Query(params): Query<CityQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let query = params.q.trim();
    if query.len() < 2 {
        return Ok(Json(json!([])));
    }

    state
        .geo
        .search_cities(query)
        .await
        .map(|cities| Json(serde_json::to_value(cities).unwrap()))
        .map_err(|e| {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": format!("City lookup failed: {e}") })),
            )
        })
}
