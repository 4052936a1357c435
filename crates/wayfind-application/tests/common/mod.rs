#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use wayfind_application::DisplayEvent;
use wayfind_core::config::WorkflowConfig;
use wayfind_core::error::{Result, WayfindError};
use wayfind_core::geometry::Point;
use wayfind_core::search::{
    ATTR_MATCH_ADDRESS, FeatureQuery, FeatureSource, GeocodeClient, ResultItem, SearchParams,
    SuggestParams, Suggestion,
};

#[derive(Clone)]
struct Reply<T> {
    delay: Duration,
    outcome: Result<T>,
}

/// A recorded client call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Search { text: String, params: SearchParams },
    Suggest { text: String, params: SuggestParams },
    Reverse(Point),
}

/// Geocoder with canned, optionally delayed, replies per query text.
#[derive(Default)]
pub struct ScriptedGeocoder {
    searches: HashMap<String, Reply<Vec<ResultItem>>>,
    suggestions: HashMap<String, Reply<Vec<Suggestion>>>,
    addresses: Vec<(Point, String)>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(self, text: &str, items: Vec<ResultItem>) -> Self {
        self.with_slow_search(text, Duration::ZERO, items)
    }

    pub fn with_slow_search(mut self, text: &str, delay: Duration, items: Vec<ResultItem>) -> Self {
        self.searches.insert(
            text.to_string(),
            Reply {
                delay,
                outcome: Ok(items),
            },
        );
        self
    }

    pub fn with_search_error(self, text: &str, message: &str) -> Self {
        self.with_slow_search_error(text, Duration::ZERO, message)
    }

    pub fn with_slow_search_error(mut self, text: &str, delay: Duration, message: &str) -> Self {
        self.searches.insert(
            text.to_string(),
            Reply {
                delay,
                outcome: Err(WayfindError::client("search", message)),
            },
        );
        self
    }

    pub fn with_suggestions(mut self, text: &str, labels: &[&str]) -> Self {
        self.suggestions.insert(
            text.to_string(),
            Reply {
                delay: Duration::ZERO,
                outcome: Ok(labels.iter().map(|label| Suggestion::new(*label)).collect()),
            },
        );
        self
    }

    pub fn with_address(mut self, point: Point, address: &str) -> Self {
        self.addresses.push((point, address.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> Vec<(String, SearchParams)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Search { text, params } => Some((text, params)),
                _ => None,
            })
            .collect()
    }

    pub fn suggest_calls(&self) -> Vec<(String, SuggestParams)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Suggest { text, params } => Some((text, params)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

async fn play<T: Clone + Default>(reply: Option<&Reply<T>>) -> Result<T> {
    match reply {
        Some(reply) => {
            tokio::time::sleep(reply.delay).await;
            reply.outcome.clone()
        }
        None => Ok(T::default()),
    }
}

#[async_trait]
impl GeocodeClient for ScriptedGeocoder {
    async fn search(&self, text: &str, params: &SearchParams) -> Result<Vec<ResultItem>> {
        self.record(Call::Search {
            text: text.to_string(),
            params: params.clone(),
        });
        play(self.searches.get(text)).await
    }

    async fn reverse_lookup(&self, point: &Point) -> Result<Option<ResultItem>> {
        self.record(Call::Reverse(*point));
        let found = self
            .addresses
            .iter()
            .find(|(at, _)| at.distance_to(point) < 1e-9)
            .map(|(at, address)| {
                ResultItem::new(format!("addr-{}", address), address.clone(), *at)
                    .with_attribute(ATTR_MATCH_ADDRESS, address.clone())
            });
        Ok(found)
    }

    async fn suggest(&self, text: &str, params: &SuggestParams) -> Result<Vec<Suggestion>> {
        self.record(Call::Suggest {
            text: text.to_string(),
            params: params.clone(),
        });
        play(self.suggestions.get(text)).await
    }
}

/// Feature table matching on result labels.
pub struct StaticFeatures {
    pub items: Vec<ResultItem>,
}

#[async_trait]
impl FeatureSource for StaticFeatures {
    async fn query_features(&self, query: &FeatureQuery) -> Result<Vec<ResultItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| query.matches(&item.label))
            .cloned()
            .collect())
    }
}

/// Default config without address enrichment.
pub fn test_config() -> WorkflowConfig {
    let mut config = WorkflowConfig::default();
    config.search.enrich_with_address = false;
    config
}

pub fn place(id: &str, label: &str, lon: f64, lat: f64) -> ResultItem {
    ResultItem::new(id, label, Point::wgs84(lon, lat))
}

/// Waits (in virtual time) for the first event satisfying `pred`.
pub async fn wait_for<F>(rx: &mut broadcast::Receiver<DisplayEvent>, mut pred: F) -> DisplayEvent
where
    F: FnMut(&DisplayEvent) -> bool,
{
    let search = async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) => continue,
                Err(e) => panic!("event channel failed: {e}"),
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(30), search)
        .await
        .expect("Timed out waiting for display event")
}

/// Everything already buffered on `rx`.
pub fn drain(rx: &mut broadcast::Receiver<DisplayEvent>) -> Vec<DisplayEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
