use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::operation::{OperationKind, Ticket};

/// Coarse progress state of a long-running operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    #[default]
    Idle,
    InProgress,
    Complete,
    Failed,
}

impl OperationStatus {
    /// Whether the tracked operation has finished (either way).
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "Idle",
            Self::InProgress => "In progress",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        };
        f.write_str(label)
    }
}

/// Notification emitted on every status transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusChange {
    pub kind: OperationKind,
    /// Ticket of the operation the new state belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<Ticket>,
    pub from: OperationStatus,
    pub to: OperationStatus,
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
