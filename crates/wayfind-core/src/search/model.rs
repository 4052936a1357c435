//! Search domain models.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Envelope, Geometry, Point};

/// Attribute key holding the display title of a geocoded match.
pub const ATTR_MATCH_TITLE: &str = "Match_Title";

/// Attribute key holding the reverse-geocoded address of a match.
pub const ATTR_MATCH_ADDRESS: &str = "Match_Address";

/// Parameters that bias or restrict a forward search.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchParams {
    /// Location to rank results around
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<Point>,

    /// Only return results inside this area
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_area: Option<Envelope>,

    /// Maximum number of results to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

/// Parameters for type-ahead suggestions.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SuggestParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_location: Option<Point>,

    /// Category filter, e.g. `["POI"]`. Empty means everything.
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

/// A submitted query. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    id: String,
    text: String,
    params: SearchParams,
}

impl Query {
    /// Creates a new query with a fresh identifier.
    pub fn new(text: impl Into<String>, params: SearchParams) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            params,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }
}

/// A single record produced by the external client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultItem {
    /// Identifier, unique within one result set
    pub id: String,

    /// Display string
    pub label: String,

    /// Location or shape of the match
    pub geometry: Geometry,

    /// Opaque attributes as returned by the client
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,

    /// Match score, if the client provides one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl ResultItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>, geometry: impl Into<Geometry>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            geometry: geometry.into(),
            attributes: BTreeMap::new(),
            score: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// String attribute lookup.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(|v| v.as_str())
    }

    /// Representative location of the result.
    pub fn location(&self) -> Option<Point> {
        self.geometry.anchor()
    }
}

/// Ordered results of one query.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResultSet {
    query: Query,
    items: Vec<Arc<ResultItem>>,
}

impl ResultSet {
    pub fn new(query: Query, items: Vec<ResultItem>) -> Self {
        Self {
            query,
            items: items.into_iter().map(Arc::new).collect(),
        }
    }

    /// An empty (zero-match) result set. Not an error.
    pub fn empty(query: Query) -> Self {
        Self {
            query,
            items: Vec::new(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn items(&self) -> &[Arc<ResultItem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Arc<ResultItem>> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Union of all result extents.
    pub fn extent(&self) -> Option<Envelope> {
        self.items
            .iter()
            .filter_map(|item| item.geometry.extent())
            .reduce(|acc, e| acc.union(&e))
    }

    /// Closest result whose location lies within `tolerance` of `point`.
    pub fn nearest_within(&self, point: &Point, tolerance: f64) -> Option<&Arc<ResultItem>> {
        self.items
            .iter()
            .filter_map(|item| item.location().map(|loc| (loc.distance_to(point), item)))
            .filter(|(distance, _)| *distance <= tolerance)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, item)| item)
    }
}

/// A type-ahead suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub label: String,

    /// Opaque key the service can use to resolve the suggestion quickly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub magic_key: Option<String>,

    #[serde(default)]
    pub is_collection: bool,
}

impl Suggestion {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            magic_key: None,
            is_collection: false,
        }
    }
}

/// Attribute filter for feature-table queries: `upper(field) LIKE '%TEXT%'`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureQuery {
    pub field: String,
    /// Already trimmed and upper-cased
    pub contains: String,
}

impl FeatureQuery {
    /// Builds the filter, normalising the text the way the query expects.
    pub fn new(field: impl Into<String>, text: &str) -> Self {
        Self {
            field: field.into(),
            contains: text.trim().to_uppercase(),
        }
    }

    /// Whether an attribute value satisfies the filter.
    pub fn matches(&self, value: &str) -> bool {
        value.to_uppercase().contains(&self.contains)
    }

    /// SQL-style where clause for services that accept one.
    pub fn where_clause(&self) -> String {
        format!(
            "upper({}) LIKE '%{}%'",
            self.field,
            self.contains.replace('\'', "''")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SpatialReference;

    fn sample_set() -> ResultSet {
        ResultSet::new(
            Query::new("coffee", SearchParams::default()),
            vec![
                ResultItem::new("a", "Coffee A", Point::wgs84(0.0, 0.0)),
                ResultItem::new("b", "Coffee B", Point::wgs84(1.0, 1.0)),
                ResultItem::new("c", "Coffee C", Point::wgs84(0.2, 0.1)),
            ],
        )
    }

    #[test]
    fn test_queries_get_distinct_ids() {
        let a = Query::new("x", SearchParams::default());
        let b = Query::new("x", SearchParams::default());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.text(), "x");
    }

    #[test]
    fn test_result_set_extent_is_union() {
        let extent = sample_set().extent().unwrap();
        assert_eq!(
            extent,
            Envelope::new(0.0, 0.0, 1.0, 1.0, SpatialReference::Wgs84)
        );
        assert!(ResultSet::empty(Query::new("none", SearchParams::default()))
            .extent()
            .is_none());
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let set = sample_set();
        let hit = set.nearest_within(&Point::wgs84(0.15, 0.1), 0.5).unwrap();
        assert_eq!(hit.id, "c");
        assert!(set.nearest_within(&Point::wgs84(5.0, 5.0), 0.5).is_none());
    }

    #[test]
    fn test_feature_query_normalises_and_matches() {
        let query = FeatureQuery::new("STATE_NAME", "  new ");
        assert_eq!(query.contains, "NEW");
        assert!(query.matches("New York"));
        assert!(query.matches("new mexico"));
        assert!(!query.matches("Nevada"));
        assert_eq!(query.where_clause(), "upper(STATE_NAME) LIKE '%NEW%'");
    }

    #[test]
    fn test_where_clause_escapes_quotes() {
        let query = FeatureQuery::new("NAME", "o'hare");
        assert_eq!(query.where_clause(), "upper(NAME) LIKE '%O''HARE%'");
    }
}
