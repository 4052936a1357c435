//! Client calls that run off the update path.
//!
//! Everything here receives owned inputs captured when the operation started
//! and returns a value for the update task to apply (or discard as stale).

use std::sync::Arc;

use futures::future::join_all;

use wayfind_core::config::SearchSettings;
use wayfind_core::error::Result;
use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::search::{
    ATTR_MATCH_ADDRESS, ATTR_MATCH_TITLE, FeatureQuery, FeatureSource, GeocodeClient, Query,
    ResultItem, ResultSet, SearchParams, Suggestion, SuggestParams,
};

/// Category used to restrict search-box suggestions to places.
pub(crate) const POI_CATEGORY: &str = "POI";

/// How location text maps onto a point.
#[derive(Debug, Clone)]
pub(crate) struct LocationContext {
    pub current_location_label: String,
    pub device_location: Option<Point>,
}

impl LocationContext {
    pub fn new(settings: &SearchSettings, device_location: Option<Point>) -> Self {
        Self {
            current_location_label: settings.current_location_label.clone(),
            device_location,
        }
    }
}

/// Resolves free location text to a bias point.
///
/// Blank text yields no point. The configured "current location" label
/// yields the device location (if known). Anything else is geocoded and the
/// best match used.
pub(crate) async fn resolve_location(
    client: &dyn GeocodeClient,
    text: &str,
    context: &LocationContext,
) -> Result<Option<Point>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    if text.eq_ignore_ascii_case(&context.current_location_label) {
        if context.device_location.is_none() {
            tracing::warn!("[Search] Device location unknown, searching without a bias point");
        }
        return Ok(context.device_location);
    }

    let matches = client.search(text, &SearchParams::default()).await?;
    let point = matches.first().and_then(ResultItem::location);
    tracing::debug!("[Search] Resolved location '{}' to {:?}", text, point);
    Ok(point)
}

/// Inputs for one forward search, captured at submission.
#[derive(Debug, Clone)]
pub(crate) struct SearchJob {
    pub text: String,
    pub location_text: String,
    pub location: LocationContext,
    pub search_area: Option<Envelope>,
    pub max_results: Option<usize>,
    pub enrich_with_address: bool,
}

pub(crate) async fn run_search(client: Arc<dyn GeocodeClient>, job: SearchJob) -> Result<ResultSet> {
    let preferred_location =
        resolve_location(client.as_ref(), &job.location_text, &job.location).await?;

    let params = SearchParams {
        preferred_location,
        search_area: job.search_area,
        max_results: job.max_results,
    };

    let items = client.search(&job.text, &params).await?;
    tracing::info!("[Search] '{}' returned {} result(s)", job.text, items.len());

    let items = if job.enrich_with_address && !items.is_empty() {
        enrich_with_addresses(client.as_ref(), items).await
    } else {
        items
    };

    Ok(ResultSet::new(Query::new(job.text, params), items))
}

/// Attaches a title and reverse-geocoded address to each result.
///
/// Lookups run concurrently. A failed lookup leaves that result without an
/// address; it never fails the search.
async fn enrich_with_addresses(client: &dyn GeocodeClient, items: Vec<ResultItem>) -> Vec<ResultItem> {
    let lookups = items.iter().map(|item| async move {
        match item.location() {
            Some(point) => client.reverse_lookup(&point).await,
            None => Ok(None),
        }
    });
    let addresses = join_all(lookups).await;

    items
        .into_iter()
        .zip(addresses)
        .map(|(item, address)| {
            let title = item.label.clone();
            let item = item.with_attribute(ATTR_MATCH_TITLE, title);
            match address {
                Ok(Some(found)) => {
                    let address = found
                        .attribute_str(ATTR_MATCH_ADDRESS)
                        .map(str::to_string)
                        .unwrap_or(found.label);
                    item.with_attribute(ATTR_MATCH_ADDRESS, address)
                }
                Ok(None) => item,
                Err(e) => {
                    tracing::warn!("[Search] Address lookup failed for '{}': {}", item.label, e);
                    item
                }
            }
        })
        .collect()
}

/// Inputs for one suggestion request.
#[derive(Debug, Clone)]
pub(crate) struct SuggestJob {
    pub text: String,
    pub categories: Vec<String>,
    /// Location text to bias by, when suggesting for the search box
    pub bias_text: Option<String>,
    pub location: LocationContext,
    pub max_results: Option<usize>,
}

pub(crate) async fn run_suggest(
    client: Arc<dyn GeocodeClient>,
    job: SuggestJob,
) -> Result<Vec<Suggestion>> {
    let preferred_location = match &job.bias_text {
        Some(text) => resolve_location(client.as_ref(), text, &job.location).await?,
        None => None,
    };

    let params = SuggestParams {
        preferred_location,
        categories: job.categories,
        max_results: job.max_results,
    };
    client.suggest(&job.text, &params).await
}

pub(crate) async fn run_feature_query(
    source: Arc<dyn FeatureSource>,
    query: FeatureQuery,
) -> Result<ResultSet> {
    let items = source.query_features(&query).await?;
    tracing::info!(
        "[FeatureQuery] {} matched {} feature(s)",
        query.where_clause(),
        items.len()
    );
    Ok(ResultSet::new(
        Query::new(query.contains.clone(), SearchParams::default()),
        items,
    ))
}
