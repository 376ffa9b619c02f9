use serde::Deserialize;

use crate::models::geo::CitySuggestion;

#[derive(Debug, Deserialize)]
struct GeoResponse {
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    admin1: Option<String>,
    country: Option<String>,
}

/// City autocomplete against an external geocoding API. The upstream schema
/// is flattened here so the rest of the app never sees its JSON.
pub struct GeoService {
    client: reqwest::Client,
    endpoint: String,
}

impl GeoService {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    pub async fn search_cities(&self, query: &str) -> anyhow::Result<Vec<CitySuggestion>> {
        let response: GeoResponse = self
            .client
            .get(&self.endpoint)
            .query(&[("name", query), ("count", "10"), ("language", "en")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(flatten(response))
    }
}

fn flatten(response: GeoResponse) -> Vec<CitySuggestion> {
    response
        .results
        .unwrap_or_default()
        .into_iter()
        .map(|r| CitySuggestion {
            name: r.name,
            region: r.admin1,
            country: r.country,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_results_are_flattened() {
        let raw = r#"{"results":[
            {"name":"Lisbon","admin1":"Lisbon","country":"Portugal","latitude":38.7},
            {"name":"Lisburn","country":"United Kingdom"}
        ]}"#;
        let response: GeoResponse = serde_json::from_str(raw).unwrap();
        let cities = flatten(response);
        assert_eq!(cities.len(), 2);
        assert_eq!(cities[0].name, "Lisbon");
        assert_eq!(cities[0].region.as_deref(), Some("Lisbon"));
        assert_eq!(cities[1].region, None);
    }

    #[test]
    fn missing_results_is_an_empty_list() {
        let response: GeoResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(flatten(response).is_empty());
    }
}
