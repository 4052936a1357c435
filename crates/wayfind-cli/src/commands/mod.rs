use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::broadcast::{self, error::RecvError};

use wayfind_application::DisplayEvent;
use wayfind_core::config::WorkflowConfig;
use wayfind_core::operation::OperationKind;
use wayfind_core::status::{OperationStatus, StatusChange};

pub mod features;
pub mod render;
pub mod reverse;
pub mod search;
pub mod suggest;
pub mod type_ahead;

/// How results are printed on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
}

/// Upper bound for one workflow command: location resolution, the query
/// itself and address enrichment each get a full request timeout.
pub(crate) fn wait_limit(config: &WorkflowConfig) -> Duration {
    config.debounce() + config.geocoder.timeout() * 3 + Duration::from_secs(1)
}

/// Feeds display events to `step` until it yields an outcome.
///
/// Returns `Ok(None)` when `limit` elapses first.
pub(crate) async fn until<T, F>(
    events: &mut broadcast::Receiver<DisplayEvent>,
    limit: Duration,
    mut step: F,
) -> Result<Option<T>>
where
    F: FnMut(DisplayEvent) -> Option<Result<T>>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        let event = match tokio::time::timeout_at(deadline, events.recv()).await {
            Err(_) => return Ok(None),
            Ok(Ok(event)) => event,
            Ok(Err(RecvError::Lagged(skipped))) => {
                tracing::warn!("[CLI] Skipped {} display event(s)", skipped);
                continue;
            }
            Ok(Err(RecvError::Closed)) => return Err(anyhow!("Workflow stopped unexpectedly")),
        };

        if let Some(outcome) = step(event) {
            return outcome.map(Some);
        }
    }
}

/// Outcome once the tracked operation of `kind` has finished.
pub(crate) fn finished(change: &StatusChange, kind: OperationKind) -> Option<Result<()>> {
    if change.kind != kind {
        return None;
    }
    match change.to {
        OperationStatus::Complete => Some(Ok(())),
        OperationStatus::Failed => Some(Err(anyhow!(
            "{} failed: {}",
            kind,
            change.message.as_deref().unwrap_or("unknown error")
        ))),
        OperationStatus::Idle | OperationStatus::InProgress => None,
    }
}
