use std::sync::Arc;

use tokio::sync::broadcast;

use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::operation::{OperationKind, OperationTracker};
use wayfind_core::search::{ResultItem, ResultSet};
use wayfind_core::selection::SelectionManager;
use wayfind_core::status::{StatusChange, StatusReporter};

use super::command::InputField;
use super::event::{ResultStream, SuggestLookup, WorkflowSnapshot};

/// Shared display state, owned by the update task and never locked.
pub(crate) struct WorkflowState {
    pub search_text: String,
    pub location_text: String,
    pub search_results: Option<Arc<ResultSet>>,
    pub feature_results: Option<Arc<ResultSet>>,
    pub selection: SelectionManager,
    pub tracker: OperationTracker,
    pub search_status: StatusReporter,
    pub feature_status: StatusReporter,
    pub search_suggestions: Vec<String>,
    pub location_suggestions: Vec<String>,
    search_lookup: Option<SuggestLookup>,
    location_lookup: Option<SuggestLookup>,
    pub visible_area: Option<Envelope>,
    pub device_location: Option<Point>,
    pub callout_open: bool,
    status_changes: Vec<broadcast::Receiver<StatusChange>>,
}

impl WorkflowState {
    pub fn new() -> Self {
        let search_status = StatusReporter::new(OperationKind::Search);
        let feature_status = StatusReporter::new(OperationKind::FeatureQuery);
        let status_changes = vec![search_status.subscribe(), feature_status.subscribe()];

        Self {
            search_text: String::new(),
            location_text: String::new(),
            search_results: None,
            feature_results: None,
            selection: SelectionManager::new(),
            tracker: OperationTracker::new(),
            search_status,
            feature_status,
            search_suggestions: Vec::new(),
            location_suggestions: Vec::new(),
            search_lookup: None,
            location_lookup: None,
            visible_area: None,
            device_location: None,
            callout_open: false,
            status_changes,
        }
    }

    pub fn results_mut(&mut self, stream: ResultStream) -> &mut Option<Arc<ResultSet>> {
        match stream {
            ResultStream::Search => &mut self.search_results,
            ResultStream::Features => &mut self.feature_results,
        }
    }

    pub fn set_text(&mut self, field: InputField, text: String) {
        match field {
            InputField::Search => self.search_text = text,
            InputField::Location => self.location_text = text,
        }
    }

    pub fn suggestions_mut(&mut self, field: InputField) -> &mut Vec<String> {
        match field {
            InputField::Search => &mut self.search_suggestions,
            InputField::Location => &mut self.location_suggestions,
        }
    }

    pub fn record_lookup(&mut self, field: InputField, lookup: SuggestLookup) {
        match field {
            InputField::Search => self.search_lookup = Some(lookup),
            InputField::Location => self.location_lookup = Some(lookup),
        }
    }

    /// Looks a result up by id across both live result sets.
    pub fn find_result(&self, id: &str) -> Option<Arc<ResultItem>> {
        [&self.search_results, &self.feature_results]
            .into_iter()
            .flatten()
            .find_map(|set| set.find(id).cloned())
    }

    /// Nearest live result within `tolerance`, search results first.
    pub fn identify(&self, point: &Point, tolerance: f64) -> Option<Arc<ResultItem>> {
        [&self.search_results, &self.feature_results]
            .into_iter()
            .flatten()
            .find_map(|set| set.nearest_within(point, tolerance).cloned())
    }

    /// Status transitions recorded since the last call, in order per reporter.
    pub fn drain_status_changes(&mut self) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for rx in &mut self.status_changes {
            while let Ok(change) = rx.try_recv() {
                changes.push(change);
            }
        }
        changes
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            search_text: self.search_text.clone(),
            location_text: self.location_text.clone(),
            search_results: self.search_results.clone(),
            feature_results: self.feature_results.clone(),
            selected_ids: self
                .selection
                .selected()
                .iter()
                .map(|r| r.id.clone())
                .collect(),
            selection_extent: self.selection.bounding_extent(),
            search_status: self.search_status.status(),
            feature_status: self.feature_status.status(),
            search_suggestions: self.search_suggestions.clone(),
            location_suggestions: self.location_suggestions.clone(),
            search_lookup: self.search_lookup.clone(),
            location_lookup: self.location_lookup.clone(),
            visible_area: self.visible_area,
            device_location: self.device_location,
        }
    }
}
