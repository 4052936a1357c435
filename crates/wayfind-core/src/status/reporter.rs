use chrono::Utc;
use tokio::sync::broadcast;

use super::model::{OperationStatus, StatusChange};
use crate::operation::{OperationKind, Ticket};

const CHANNEL_CAPACITY: usize = 64;

/// Tracks the status of one operation at a time and broadcasts every
/// transition.
///
/// The reporter is owned by the single update path; it is mutated through
/// `&mut self` and never shared behind a lock. Display code listens through
/// [`StatusReporter::subscribe`].
///
/// ```
/// use wayfind_core::operation::{OperationKind, OperationTracker};
/// use wayfind_core::status::{OperationStatus, StatusReporter};
///
/// let mut tracker = OperationTracker::new();
/// let mut reporter = StatusReporter::new(OperationKind::Search);
///
/// let ticket = tracker.begin(OperationKind::Search);
/// reporter.begin(ticket);
/// assert_eq!(reporter.status(), OperationStatus::InProgress);
///
/// assert!(reporter.complete(&ticket));
/// assert_eq!(reporter.status(), OperationStatus::Complete);
/// ```
#[derive(Debug)]
pub struct StatusReporter {
    kind: OperationKind,
    status: OperationStatus,
    tracked: Option<Ticket>,
    sender: broadcast::Sender<StatusChange>,
}

impl StatusReporter {
    pub fn new(kind: OperationKind) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            kind,
            status: OperationStatus::Idle,
            tracked: None,
            sender,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Ticket of the operation currently tracked, if any.
    pub fn tracked(&self) -> Option<Ticket> {
        self.tracked
    }

    /// Subscribes to status transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusChange> {
        self.sender.subscribe()
    }

    /// Starts tracking `ticket`.
    ///
    /// A finished previous operation first falls back to `Idle`; one still in
    /// progress is superseded on the spot, without queueing.
    pub fn begin(&mut self, ticket: Ticket) {
        if self.status.is_finished() {
            self.tracked = None;
            self.transition(OperationStatus::Idle, None);
        }

        let superseded = self.tracked.filter(|_| self.status == OperationStatus::InProgress);
        self.tracked = Some(ticket);
        let message = superseded.map(|old| format!("superseded {old}"));
        if let Some(old) = superseded {
            tracing::debug!("[Status] {} supersedes {}", ticket, old);
        }
        self.transition(OperationStatus::InProgress, message);
    }

    /// Marks `ticket` complete. Returns false (and changes nothing) when the
    /// ticket is not the tracked in-progress operation.
    pub fn complete(&mut self, ticket: &Ticket) -> bool {
        if !self.is_tracking(ticket) {
            return false;
        }
        self.transition(OperationStatus::Complete, None);
        true
    }

    /// Marks `ticket` failed. Same staleness rule as [`Self::complete`].
    pub fn fail(&mut self, ticket: &Ticket, message: impl Into<String>) -> bool {
        if !self.is_tracking(ticket) {
            return false;
        }
        self.transition(OperationStatus::Failed, Some(message.into()));
        true
    }

    /// Drops whatever is tracked and returns to `Idle`.
    pub fn reset(&mut self) {
        self.tracked = None;
        if self.status != OperationStatus::Idle {
            self.transition(OperationStatus::Idle, None);
        }
    }

    fn is_tracking(&self, ticket: &Ticket) -> bool {
        self.status == OperationStatus::InProgress && self.tracked.as_ref() == Some(ticket)
    }

    fn transition(&mut self, to: OperationStatus, message: Option<String>) {
        let change = StatusChange {
            kind: self.kind,
            ticket: self.tracked,
            from: self.status,
            to,
            at: Utc::now(),
            message,
        };
        self.status = to;
        // No subscribers is fine
        let _ = self.sender.send(change);
    }
}
