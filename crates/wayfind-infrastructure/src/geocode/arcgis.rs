//! Geocoder backed by an ArcGIS GeocodeServer REST endpoint.
//!
//! Uses the `findAddressCandidates`, `reverseGeocode` and `suggest`
//! operations with `f=json`. Service-level failures come back as HTTP 200
//! with an `{"error": {...}}` body and are mapped to client errors.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use wayfind_core::config::GeocoderSettings;
use wayfind_core::error::{Result, WayfindError};
use wayfind_core::geometry::{Envelope, Point, SpatialReference};
use wayfind_core::search::{
    ATTR_MATCH_ADDRESS, GeocodeClient, ResultItem, SearchParams, SuggestParams, Suggestion,
};

const OP_SEARCH: &str = "search";
const OP_REVERSE: &str = "reverse_lookup";
const OP_SUGGEST: &str = "suggest";

/// Detail text the service returns when a location has no address.
const NO_ADDRESS_DETAIL: &str = "Unable to find address";

/// Geocoder speaking the ArcGIS GeocodeServer REST dialect.
#[derive(Clone)]
pub struct ArcGisGeocoder {
    client: Client,
    service_url: String,
    max_results: Option<usize>,
}

impl ArcGisGeocoder {
    /// Builds the HTTP client from geocoder settings.
    pub fn new(settings: &GeocoderSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(settings.user_agent.clone())
            .build()
            .map_err(|e| WayfindError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            service_url: settings.service_url.trim_end_matches('/').to_string(),
            max_results: settings.max_results,
        })
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    async fn get(&self, operation: &'static str, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}/{}", self.service_url, path);
        tracing::debug!("[ArcGIS] GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| WayfindError::client(operation, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WayfindError::client(
                operation,
                format!("geocode service returned status {status}"),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| WayfindError::client(operation, format!("invalid response body: {e}")))
    }
}

#[async_trait]
impl GeocodeClient for ArcGisGeocoder {
    async fn search(&self, text: &str, params: &SearchParams) -> Result<Vec<ResultItem>> {
        require_text(text)?;
        let query = search_query(text, params, self.max_results);
        let body = self.get(OP_SEARCH, "findAddressCandidates", &query).await?;
        parse_candidates(body)
    }

    async fn reverse_lookup(&self, point: &Point) -> Result<Option<ResultItem>> {
        let query = vec![
            ("f", "json".to_string()),
            ("location", point_json(point)),
        ];
        let body = self.get(OP_REVERSE, "reverseGeocode", &query).await?;
        parse_reverse(body)
    }

    async fn suggest(&self, text: &str, params: &SuggestParams) -> Result<Vec<Suggestion>> {
        require_text(text)?;
        let query = suggest_query(text, params, self.max_results);
        let body = self.get(OP_SUGGEST, "suggest", &query).await?;
        parse_suggestions(body)
    }
}

// ============================================================================
// Request building
// ============================================================================

fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(WayfindError::InvalidQuery("query text is blank".to_string()));
    }
    Ok(())
}

fn search_query(text: &str, params: &SearchParams, default_max: Option<usize>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("f", "json".to_string()),
        ("SingleLine", text.to_string()),
        ("outFields", "*".to_string()),
        ("outSR", SpatialReference::Wgs84.wkid().to_string()),
    ];
    if let Some(location) = &params.preferred_location {
        query.push(("location", point_json(location)));
    }
    if let Some(area) = &params.search_area {
        query.push(("searchExtent", envelope_json(area)));
    }
    if let Some(max) = params.max_results.or(default_max) {
        query.push(("maxLocations", max.to_string()));
    }
    query
}

fn suggest_query(text: &str, params: &SuggestParams, default_max: Option<usize>) -> Vec<(&'static str, String)> {
    let mut query = vec![("f", "json".to_string()), ("text", text.to_string())];
    if let Some(location) = &params.preferred_location {
        query.push(("location", point_json(location)));
    }
    if !params.categories.is_empty() {
        query.push(("category", params.categories.join(",")));
    }
    if let Some(max) = params.max_results.or(default_max) {
        query.push(("maxSuggestions", max.to_string()));
    }
    query
}

fn point_json(point: &Point) -> String {
    serde_json::json!({
        "x": point.x,
        "y": point.y,
        "spatialReference": { "wkid": point.spatial_reference.wkid() },
    })
    .to_string()
}

fn envelope_json(envelope: &Envelope) -> String {
    serde_json::json!({
        "xmin": envelope.xmin,
        "ymin": envelope.ymin,
        "xmax": envelope.xmax,
        "ymax": envelope.ymax,
        "spatialReference": { "wkid": envelope.spatial_reference.wkid() },
    })
    .to_string()
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Deserialize)]
struct ServiceError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

impl ServiceError {
    fn describe(&self) -> String {
        let mut text = match self.code {
            Some(code) => format!("{} (code {})", self.message, code),
            None => self.message.clone(),
        };
        if !self.details.is_empty() {
            text.push_str(": ");
            text.push_str(&self.details.join("; "));
        }
        text
    }
}

#[derive(Deserialize, Default)]
struct WireSpatialReference {
    #[serde(default)]
    wkid: Option<u32>,
    #[serde(default, rename = "latestWkid")]
    latest_wkid: Option<u32>,
}

impl WireSpatialReference {
    fn resolve(&self) -> SpatialReference {
        self.latest_wkid
            .or(self.wkid)
            .and_then(SpatialReference::from_wkid)
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct WirePoint {
    x: f64,
    y: f64,
    #[serde(default, rename = "spatialReference")]
    spatial_reference: Option<WireSpatialReference>,
}

#[derive(Deserialize)]
struct CandidatesResponse {
    #[serde(default, rename = "spatialReference")]
    spatial_reference: WireSpatialReference,
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    address: String,
    location: WirePoint,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    attributes: BTreeMap<String, Value>,
}

#[derive(Deserialize)]
struct ReverseResponse {
    address: BTreeMap<String, Value>,
    location: WirePoint,
}

#[derive(Deserialize)]
struct SuggestResponse {
    #[serde(default)]
    suggestions: Vec<WireSuggestion>,
}

#[derive(Deserialize)]
struct WireSuggestion {
    text: String,
    #[serde(default, rename = "magicKey")]
    magic_key: Option<String>,
    #[serde(default, rename = "isCollection")]
    is_collection: bool,
}

/// Splits a service error out of a response body.
fn service_error(body: &Value) -> Option<ServiceError> {
    body.get("error")
        .and_then(|e| serde_json::from_value::<ServiceError>(e.clone()).ok())
}

fn decode<T: for<'de> Deserialize<'de>>(operation: &'static str, body: Value) -> Result<T> {
    if let Some(err) = service_error(&body) {
        return Err(WayfindError::client(operation, err.describe()));
    }
    serde_json::from_value(body)
        .map_err(|e| WayfindError::client(operation, format!("unexpected response shape: {e}")))
}

pub(crate) fn parse_candidates(body: Value) -> Result<Vec<ResultItem>> {
    let response: CandidatesResponse = decode(OP_SEARCH, body)?;
    let default_sr = response.spatial_reference.resolve();

    Ok(response
        .candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| {
            let sr = candidate
                .location
                .spatial_reference
                .as_ref()
                .map_or(default_sr, WireSpatialReference::resolve);
            let point = Point::new(candidate.location.x, candidate.location.y, sr);
            let mut item = ResultItem::new(format!("candidate-{index}"), candidate.address, point);
            item.attributes = candidate.attributes;
            item.score = candidate.score;
            item
        })
        .collect())
}

pub(crate) fn parse_reverse(body: Value) -> Result<Option<ResultItem>> {
    if let Some(err) = service_error(&body) {
        if err.details.iter().any(|d| d.contains(NO_ADDRESS_DETAIL)) {
            return Ok(None);
        }
        return Err(WayfindError::client(OP_REVERSE, err.describe()));
    }

    let response: ReverseResponse = decode(OP_REVERSE, body)?;
    let label = ["LongLabel", "Match_addr", "Address"]
        .iter()
        .find_map(|key| response.address.get(*key).and_then(Value::as_str))
        .filter(|label| !label.is_empty())
        .map(str::to_string);
    let Some(label) = label else {
        return Ok(None);
    };

    let sr = response
        .location
        .spatial_reference
        .as_ref()
        .map_or(SpatialReference::Wgs84, WireSpatialReference::resolve);
    let point = Point::new(response.location.x, response.location.y, sr);

    let mut item = ResultItem::new("reverse-0", label.clone(), point);
    item.attributes = response.address;
    item.attributes
        .insert(ATTR_MATCH_ADDRESS.to_string(), Value::String(label));
    Ok(Some(item))
}

pub(crate) fn parse_suggestions(body: Value) -> Result<Vec<Suggestion>> {
    let response: SuggestResponse = decode(OP_SUGGEST, body)?;
    Ok(response
        .suggestions
        .into_iter()
        .map(|s| Suggestion {
            label: s.text,
            magic_key: s.magic_key,
            is_collection: s.is_collection,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_candidates() {
        let body = json!({
            "spatialReference": { "wkid": 4326, "latestWkid": 4326 },
            "candidates": [
                {
                    "address": "Starbucks",
                    "location": { "x": -117.195, "y": 34.057 },
                    "score": 100,
                    "attributes": { "Type": "Coffee Shop" }
                },
                {
                    "address": "Starbucks Reserve",
                    "location": { "x": -117.18, "y": 34.06 },
                    "score": 97.5,
                    "attributes": {}
                }
            ]
        });

        let items = parse_candidates(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].label, "Starbucks");
        assert_eq!(items[0].location(), Some(Point::wgs84(-117.195, 34.057)));
        assert_eq!(items[0].attribute_str("Type"), Some("Coffee Shop"));
        assert_eq!(items[1].score, Some(97.5));
        assert_ne!(items[0].id, items[1].id);
    }

    #[test]
    fn test_parse_candidates_empty_is_ok() {
        let items = parse_candidates(json!({ "candidates": [] })).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_parse_candidates_mercator_reference() {
        let body = json!({
            "spatialReference": { "wkid": 102100, "latestWkid": 3857 },
            "candidates": [
                { "address": "X", "location": { "x": 1.0, "y": 2.0 } }
            ]
        });
        let items = parse_candidates(body).unwrap();
        let location = items[0].location().unwrap();
        assert_eq!(location.spatial_reference, SpatialReference::WebMercator);
    }

    #[test]
    fn test_service_error_becomes_client_error() {
        let body = json!({
            "error": { "code": 498, "message": "Invalid Token", "details": [] }
        });
        let err = parse_candidates(body).unwrap_err();
        assert!(err.is_client());
        assert!(err.to_string().contains("Invalid Token"));
        assert!(err.to_string().contains("498"));
    }

    #[test]
    fn test_parse_reverse() {
        let body = json!({
            "address": {
                "Match_addr": "380 New York St, Redlands, California, 92373",
                "LongLabel": "380 New York St, Redlands, CA, 92373, USA",
                "City": "Redlands"
            },
            "location": {
                "x": -117.1957,
                "y": 34.0564,
                "spatialReference": { "wkid": 4326, "latestWkid": 4326 }
            }
        });

        let item = parse_reverse(body).unwrap().unwrap();
        assert_eq!(item.label, "380 New York St, Redlands, CA, 92373, USA");
        assert_eq!(
            item.attribute_str(ATTR_MATCH_ADDRESS),
            Some("380 New York St, Redlands, CA, 92373, USA")
        );
        assert_eq!(item.attribute_str("City"), Some("Redlands"));
    }

    #[test]
    fn test_parse_reverse_no_address_is_none() {
        let body = json!({
            "error": {
                "code": 400,
                "message": "Cannot perform query. Invalid query parameters.",
                "details": ["Unable to find address for the specified location."]
            }
        });
        assert!(parse_reverse(body).unwrap().is_none());
    }

    #[test]
    fn test_parse_suggestions() {
        let body = json!({
            "suggestions": [
                { "text": "Starbucks, Redlands, CA", "magicKey": "abc", "isCollection": false },
                { "text": "Starbucks", "magicKey": "def", "isCollection": true }
            ]
        });
        let suggestions = parse_suggestions(body).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].label, "Starbucks, Redlands, CA");
        assert_eq!(suggestions[0].magic_key.as_deref(), Some("abc"));
        assert!(suggestions[1].is_collection);
    }

    #[test]
    fn test_search_query_parameters() {
        let params = SearchParams {
            preferred_location: Some(Point::wgs84(-117.0, 34.0)),
            search_area: Some(Envelope::new(-118.0, 33.0, -116.0, 35.0, SpatialReference::Wgs84)),
            max_results: None,
        };
        let query = search_query("coffee", &params, Some(5));

        let get = |key: &str| query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
        assert_eq!(get("SingleLine").as_deref(), Some("coffee"));
        assert_eq!(get("maxLocations").as_deref(), Some("5"));
        assert!(get("location").unwrap().contains("\"wkid\":4326"));
        assert!(get("searchExtent").unwrap().contains("\"xmin\":-118.0"));
    }

    #[test]
    fn test_suggest_query_categories() {
        let params = SuggestParams {
            categories: vec!["POI".to_string()],
            ..Default::default()
        };
        let query = suggest_query("sta", &params, None);
        assert!(query.contains(&("category", "POI".to_string())));
        assert!(!query.iter().any(|(k, _)| *k == "maxSuggestions"));
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected_without_a_request() {
        let geocoder = ArcGisGeocoder::new(&GeocoderSettings {
            service_url: "http://127.0.0.1:9/GeocodeServer".to_string(),
            ..Default::default()
        })
        .unwrap();

        let err = geocoder
            .search("   ", &SearchParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WayfindError::InvalidQuery(_)));

        let err = geocoder
            .suggest("", &SuggestParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, WayfindError::InvalidQuery(_)));
    }
}
