use serde::{Deserialize, Serialize};

/// One city autocomplete suggestion, already flattened from the upstream
/// geocoding response.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CitySuggestion {
    pub name: String,
    pub region: Option<String>,
    pub country: Option<String>,
}

/// Query params for GET /geo/cities.
#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub q: String,
}
