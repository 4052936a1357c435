use std::sync::Arc;

use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::status::{OperationStatus, StatusChange};
use wayfind_core::search::ResultSet;

use super::command::InputField;

/// Which query stream a result set belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStream {
    /// Forward geocode results
    Search,
    /// Feature-table query results
    Features,
}

/// Notifications for the display boundary.
#[derive(Debug, Clone)]
pub enum DisplayEvent {
    /// A new live result set replaced the previous one
    ResultsReplaced {
        stream: ResultStream,
        results: Arc<ResultSet>,
    },
    /// The live result set was discarded
    ResultsCleared { stream: ResultStream },
    /// The query completed with zero matches
    NoMatches { stream: ResultStream, query: String },
    SuggestionsUpdated {
        field: InputField,
        labels: Vec<String>,
    },
    SelectionChanged {
        count: usize,
        extent: Option<Envelope>,
    },
    /// The display should show this area
    ViewpointRequested(Envelope),
    StatusChanged(StatusChange),
    CalloutShown {
        title: String,
        detail: Option<String>,
        location: Point,
    },
    CalloutDismissed,
    AddressResolved {
        point: Point,
        address: Option<String>,
    },
    /// A user-visible failure
    Error { operation: String, message: String },
}

/// The most recent suggestion lookup that finished for one input box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestLookup {
    /// Trimmed text that was looked up
    pub text: String,
    /// Suggestions the client returned; zero leaves the previous list shown
    pub found: usize,
    pub failed: bool,
}

/// Point-in-time copy of the workflow state.
#[derive(Debug, Clone)]
pub struct WorkflowSnapshot {
    pub search_text: String,
    pub location_text: String,
    pub search_results: Option<Arc<ResultSet>>,
    pub feature_results: Option<Arc<ResultSet>>,
    pub selected_ids: Vec<String>,
    pub selection_extent: Option<Envelope>,
    pub search_status: OperationStatus,
    pub feature_status: OperationStatus,
    pub search_suggestions: Vec<String>,
    pub location_suggestions: Vec<String>,
    pub search_lookup: Option<SuggestLookup>,
    pub location_lookup: Option<SuggestLookup>,
    pub visible_area: Option<Envelope>,
    pub device_location: Option<Point>,
}

impl WorkflowSnapshot {
    pub fn suggestions(&self, field: InputField) -> &[String] {
        match field {
            InputField::Search => &self.search_suggestions,
            InputField::Location => &self.location_suggestions,
        }
    }

    pub fn lookup(&self, field: InputField) -> Option<&SuggestLookup> {
        match field {
            InputField::Search => self.search_lookup.as_ref(),
            InputField::Location => self.location_lookup.as_ref(),
        }
    }

    /// Labels of the live search results, in order.
    pub fn search_labels(&self) -> Vec<String> {
        self.search_results
            .as_ref()
            .map(|set| set.items().iter().map(|r| r.label.clone()).collect())
            .unwrap_or_default()
    }
}
