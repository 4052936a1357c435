//! Client traits for the external geocoding and feature-query services.

use async_trait::async_trait;

use crate::error::Result;
use crate::geometry::Point;
use crate::search::{FeatureQuery, ResultItem, SearchParams, SuggestParams, Suggestion};

/// Geocoding service consumed by the workflow.
///
/// Every call is a single shot: implementations must not retry on their own,
/// the caller decides whether to issue the request again.
#[async_trait]
pub trait GeocodeClient: Send + Sync {
    /// Forward geocode `text` into matching places.
    ///
    /// # Arguments
    /// * `text` - The free-text query (address, place name, category)
    /// * `params` - Optional spatial bias / restriction
    ///
    /// # Returns
    /// Matches in service order. An empty vector is a valid zero-match outcome.
    async fn search(&self, text: &str, params: &SearchParams) -> Result<Vec<ResultItem>>;

    /// Reverse geocode a location into the closest address, if any.
    async fn reverse_lookup(&self, point: &Point) -> Result<Option<ResultItem>>;

    /// Type-ahead suggestions for partially entered text.
    async fn suggest(&self, text: &str, params: &SuggestParams) -> Result<Vec<Suggestion>>;
}

/// A queryable table of features (e.g. US state polygons).
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Returns every feature whose attribute satisfies `query`.
    async fn query_features(&self, query: &FeatureQuery) -> Result<Vec<ResultItem>>;
}
