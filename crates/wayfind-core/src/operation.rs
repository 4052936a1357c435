//! Operation tickets and supersession tracking.
//!
//! Every started operation gets a [`Ticket`] carrying a generation number
//! that grows per [`OperationKind`]. A completion is only applied to shared
//! state when its ticket is still the latest one of its kind; older results
//! are discarded rather than aborted.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kinds of operation that supersede each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Forward geocode of the search box
    Search,
    /// Suggestions for the search box
    SearchSuggest,
    /// Suggestions for the location box
    LocationSuggest,
    /// Attribute query against a feature table
    FeatureQuery,
    /// Stand-alone reverse lookup of a point
    ReverseLookup,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::SearchSuggest => "search_suggest",
            Self::LocationSuggest => "location_suggest",
            Self::FeatureQuery => "feature_query",
            Self::ReverseLookup => "reverse_lookup",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one started operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Ticket {
    pub kind: OperationKind,
    pub generation: u64,
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.kind, self.generation)
    }
}

/// Latest generation per operation kind.
#[derive(Debug, Default)]
pub struct OperationTracker {
    latest: HashMap<OperationKind, u64>,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new operation of `kind`, superseding any earlier one.
    pub fn begin(&mut self, kind: OperationKind) -> Ticket {
        let generation = self.latest.entry(kind).or_insert(0);
        *generation += 1;
        Ticket {
            kind,
            generation: *generation,
        }
    }

    /// Supersedes whatever is in flight for `kind` without starting anything.
    pub fn invalidate(&mut self, kind: OperationKind) {
        *self.latest.entry(kind).or_insert(0) += 1;
    }

    /// Whether `ticket` is still the most recent operation of its kind.
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.kind) == Some(&ticket.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let mut tracker = OperationTracker::new();
        let a = tracker.begin(OperationKind::Search);
        let b = tracker.begin(OperationKind::Search);

        assert!(!tracker.is_current(&a));
        assert!(tracker.is_current(&b));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut tracker = OperationTracker::new();
        let search = tracker.begin(OperationKind::Search);
        let suggest = tracker.begin(OperationKind::SearchSuggest);
        tracker.begin(OperationKind::SearchSuggest);

        assert!(tracker.is_current(&search));
        assert!(!tracker.is_current(&suggest));
    }

    #[test]
    fn test_invalidate_drops_in_flight_ticket() {
        let mut tracker = OperationTracker::new();
        let ticket = tracker.begin(OperationKind::FeatureQuery);
        tracker.invalidate(OperationKind::FeatureQuery);
        assert!(!tracker.is_current(&ticket));
    }
}
