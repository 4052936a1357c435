//! In-memory gazetteer geocoder.
//!
//! Used for offline runs and demos: a fixed list of named places, searched by
//! case-insensitive substring and ranked by distance to the preferred
//! location.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wayfind_core::error::Result;
use wayfind_core::geometry::Point;
use wayfind_core::search::{
    ATTR_MATCH_ADDRESS, GeocodeClient, ResultItem, SearchParams, SuggestParams, Suggestion,
};

/// Default cap on results when the request does not set one.
const DEFAULT_MAX_RESULTS: usize = 20;

/// One named place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    pub location: Point,
    /// Category such as "POI", "Address", "City"
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Place {
    pub fn new(name: impl Into<String>, location: Point) -> Self {
        Self {
            name: name.into(),
            address: None,
            location,
            category: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    fn in_category(&self, categories: &[String]) -> bool {
        categories.is_empty()
            || self
                .category
                .as_ref()
                .is_some_and(|c| categories.iter().any(|wanted| wanted.eq_ignore_ascii_case(c)))
    }

    fn to_result(&self, id: String) -> ResultItem {
        let mut item = ResultItem::new(id, self.name.clone(), self.location);
        item.attributes = self.attributes.clone();
        if let Some(category) = &self.category {
            item.attributes
                .insert("Type".to_string(), Value::String(category.clone()));
        }
        item
    }
}

/// Gazetteer-backed [`GeocodeClient`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryGeocoder {
    places: Vec<Place>,
    /// Max distance for reverse lookup, in the units of the tapped point
    reverse_tolerance: f64,
}

impl InMemoryGeocoder {
    pub fn new(places: Vec<Place>) -> Self {
        Self {
            places,
            reverse_tolerance: 0.01,
        }
    }

    pub fn with_reverse_tolerance(mut self, tolerance: f64) -> Self {
        self.reverse_tolerance = tolerance;
        self
    }

    /// Loads places from a JSON array file.
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let places: Vec<Place> = serde_json::from_str(&text)?;
        tracing::info!(
            "[Gazetteer] loaded {} places from {}",
            places.len(),
            path.as_ref().display()
        );
        Ok(Self::new(places))
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }
}

#[async_trait]
impl GeocodeClient for InMemoryGeocoder {
    async fn search(&self, text: &str, params: &SearchParams) -> Result<Vec<ResultItem>> {
        let needle = text.trim().to_lowercase();
        let mut matches: Vec<(usize, &Place)> = self
            .places
            .iter()
            .enumerate()
            .filter(|(_, place)| place.name.to_lowercase().contains(&needle))
            .filter(|(_, place)| {
                params
                    .search_area
                    .as_ref()
                    .is_none_or(|area| area.contains(&place.location))
            })
            .collect();

        if let Some(anchor) = &params.preferred_location {
            matches.sort_by(|(_, a), (_, b)| {
                anchor
                    .distance_to(&a.location)
                    .total_cmp(&anchor.distance_to(&b.location))
            });
        }

        let max = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        Ok(matches
            .into_iter()
            .take(max)
            .map(|(index, place)| place.to_result(format!("place-{index}")))
            .collect())
    }

    async fn reverse_lookup(&self, point: &Point) -> Result<Option<ResultItem>> {
        let nearest = self
            .places
            .iter()
            .enumerate()
            .map(|(index, place)| (point.distance_to(&place.location), index, place))
            .filter(|(distance, _, _)| *distance <= self.reverse_tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0));

        Ok(nearest.map(|(_, index, place)| {
            let address = place.address.clone().unwrap_or_else(|| place.name.clone());
            place
                .to_result(format!("place-{index}"))
                .with_attribute(ATTR_MATCH_ADDRESS, address)
        }))
    }

    async fn suggest(&self, text: &str, params: &SuggestParams) -> Result<Vec<Suggestion>> {
        let needle = text.trim().to_lowercase();
        let mut matches: Vec<&Place> = self
            .places
            .iter()
            .filter(|place| place.in_category(&params.categories))
            .filter(|place| place.name.to_lowercase().contains(&needle))
            .collect();

        // Prefix matches first, then by distance when biased
        matches.sort_by(|a, b| {
            let a_prefix = !a.name.to_lowercase().starts_with(&needle);
            let b_prefix = !b.name.to_lowercase().starts_with(&needle);
            a_prefix.cmp(&b_prefix).then_with(|| match &params.preferred_location {
                Some(anchor) => anchor
                    .distance_to(&a.location)
                    .total_cmp(&anchor.distance_to(&b.location)),
                None => std::cmp::Ordering::Equal,
            })
        });

        let max = params.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let mut labels: Vec<String> = Vec::new();
        for place in matches {
            if labels.len() >= max {
                break;
            }
            if !labels.contains(&place.name) {
                labels.push(place.name.clone());
            }
        }
        Ok(labels.into_iter().map(Suggestion::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfind_core::geometry::{Envelope, SpatialReference};

    fn gazetteer() -> InMemoryGeocoder {
        InMemoryGeocoder::new(vec![
            Place::new("Starbucks Redlands", Point::wgs84(-117.19, 34.05))
                .with_category("POI")
                .with_address("101 State St, Redlands"),
            Place::new("Starbucks Riverside", Point::wgs84(-117.39, 33.98)).with_category("POI"),
            Place::new("Redlands", Point::wgs84(-117.18, 34.055)).with_category("City"),
            Place::new("Star Market", Point::wgs84(-118.0, 34.2)).with_category("POI"),
        ])
    }

    #[tokio::test]
    async fn test_search_orders_by_preferred_location() {
        let params = SearchParams {
            preferred_location: Some(Point::wgs84(-117.4, 33.98)),
            ..Default::default()
        };
        let results = gazetteer().search("starbucks", &params).await.unwrap();
        let labels: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Starbucks Riverside", "Starbucks Redlands"]);
    }

    #[tokio::test]
    async fn test_search_respects_area_and_max() {
        let params = SearchParams {
            search_area: Some(Envelope::new(-117.3, 34.0, -117.0, 34.1, SpatialReference::Wgs84)),
            max_results: Some(1),
            ..Default::default()
        };
        let results = gazetteer().search("star", &params).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].label, "Starbucks Redlands");
    }

    #[tokio::test]
    async fn test_search_no_match_is_empty_not_error() {
        let results = gazetteer()
            .search("pizza", &SearchParams::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_filters_category_and_prefers_prefix() {
        let params = SuggestParams {
            categories: vec!["POI".to_string()],
            ..Default::default()
        };
        let suggestions = gazetteer().suggest("star", &params).await.unwrap();
        let labels: Vec<&str> = suggestions.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels.len(), 3);
        assert!(!labels.contains(&"Redlands"));

        let city = gazetteer()
            .suggest("lands", &SuggestParams::default())
            .await
            .unwrap();
        assert!(city.iter().any(|s| s.label == "Redlands"));
    }

    #[tokio::test]
    async fn test_reverse_lookup_nearest_within_tolerance() {
        let geocoder = gazetteer();
        let hit = geocoder
            .reverse_lookup(&Point::wgs84(-117.191, 34.05))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.attribute_str(ATTR_MATCH_ADDRESS), Some("101 State St, Redlands"));

        let miss = geocoder.reverse_lookup(&Point::wgs84(0.0, 0.0)).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn test_reverse_lookup_accepts_mercator_point() {
        let tapped = Point::wgs84(-117.19, 34.05).project(SpatialReference::WebMercator);
        let hit = gazetteer()
            .with_reverse_tolerance(50.0)
            .reverse_lookup(&tapped)
            .await
            .unwrap();
        assert_eq!(hit.unwrap().label, "Starbucks Redlands");
    }
}
