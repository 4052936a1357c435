use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use wayfind_core::error::Result;
use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::operation::{OperationKind, Ticket};
use wayfind_core::search::{ResultItem, ResultSet, Suggestion};

use super::event::WorkflowSnapshot;

/// Text inputs with search-as-you-type suggestions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InputField {
    /// What to look for ("Starbucks")
    Search,
    /// Where to look around ("Redlands, CA" or "Current Location")
    Location,
}

impl InputField {
    /// Operation kind of this box's suggestion lookups.
    pub fn suggest_kind(self) -> OperationKind {
        match self {
            Self::Search => OperationKind::SearchSuggest,
            Self::Location => OperationKind::LocationSuggest,
        }
    }
}

/// A forward search submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchRequest {
    pub text: String,
    /// Free text resolved to a bias point; blank means no bias
    #[serde(default)]
    pub location_text: String,
    /// Only return results inside the visible area
    #[serde(default)]
    pub restrict_to_extent: bool,
}

impl SearchRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn near(mut self, location_text: impl Into<String>) -> Self {
        self.location_text = location_text.into();
        self
    }

    pub fn within_visible_area(mut self) -> Self {
        self.restrict_to_extent = true;
        self
    }
}

/// Commands issued by the display boundary.
#[derive(Debug)]
pub(crate) enum Command {
    /// Raw edit of an input box (recorded immediately)
    TextEdited { field: InputField, text: String },
    /// Input box text after the debounce quiet period
    TextSettled { field: InputField, text: String },
    Submit(SearchRequest),
    /// Submit using the current input box texts
    SubmitCurrent { restrict_to_extent: bool },
    QueryFeatures { text: String },
    ReverseLookup { point: Point },
    Select { result_id: String },
    Clear,
    Identify { point: Point },
    SetVisibleArea(Envelope),
    SetDeviceLocation(Point),
    Snapshot(oneshot::Sender<WorkflowSnapshot>),
}

/// Results of async client calls, routed back to the update path.
#[derive(Debug)]
pub(crate) enum Completion {
    Search {
        ticket: Ticket,
        outcome: Result<ResultSet>,
    },
    Suggest {
        ticket: Ticket,
        field: InputField,
        text: String,
        outcome: Result<Vec<Suggestion>>,
    },
    FeatureQuery {
        ticket: Ticket,
        outcome: Result<ResultSet>,
    },
    ReverseLookup {
        ticket: Ticket,
        point: Point,
        outcome: Result<Option<ResultItem>>,
    },
}

impl Completion {
    pub(crate) fn ticket(&self) -> &Ticket {
        match self {
            Self::Search { ticket, .. }
            | Self::Suggest { ticket, .. }
            | Self::FeatureQuery { ticket, .. }
            | Self::ReverseLookup { ticket, .. } => ticket,
        }
    }
}

/// Everything that reaches the single update path.
#[derive(Debug)]
pub(crate) enum Message {
    Command(Command),
    Completion(Completion),
}
