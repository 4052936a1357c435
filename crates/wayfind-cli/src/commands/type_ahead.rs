use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use colored::Colorize;
use tokio::sync::broadcast::{self, error::TryRecvError};

use wayfind_application::{DisplayEvent, InputField, SearchWorkflow, SuggestLookup};
use wayfind_core::config::WorkflowConfig;
use wayfind_core::search::GeocodeClient;

use super::{Output, render, wait_limit};

/// How often the workflow is asked whether the final lookup has finished.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Types `text` one character at a time, `interval_ms` apart, and prints the
/// suggestions of the final debounced value.
pub async fn run(
    client: Arc<dyn GeocodeClient>,
    config: WorkflowConfig,
    text: &str,
    field: InputField,
    interval_ms: u64,
    output: Output,
) -> Result<()> {
    if text.trim().is_empty() {
        eprintln!("Nothing to type");
        return Ok(());
    }

    let limit = wait_limit(&config);
    let workflow = SearchWorkflow::spawn(client, None, config);
    let mut events = workflow.subscribe();
    let interval = Duration::from_millis(interval_ms);

    let mut typed = String::new();
    for ch in text.chars() {
        typed.push(ch);
        eprintln!("{} {}", ">".dimmed(), typed);
        match field {
            InputField::Search => workflow.search_text_changed(typed.as_str())?,
            InputField::Location => workflow.location_text_changed(typed.as_str())?,
        }
        tokio::time::sleep(interval).await;
    }

    // The final lookup may have finished during the last interval already;
    // an earlier prefix's lookup never matches the final text.
    let wanted = typed.trim();
    let deadline = tokio::time::Instant::now() + limit;
    let (snapshot, lookup) = loop {
        let snapshot = workflow.snapshot().await?;
        let finished = snapshot.lookup(field).filter(|l| l.text == wanted).cloned();
        if let Some(lookup) = finished {
            break (snapshot, lookup);
        }
        if tokio::time::Instant::now() >= deadline {
            workflow.shutdown().await;
            bail!("Timed out waiting for suggestions for '{}'", wanted);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };
    workflow.shutdown().await;

    match lookup {
        SuggestLookup { failed: true, .. } => {
            let message = last_error(&mut events, field)
                .unwrap_or_else(|| "suggestion lookup failed".to_string());
            Err(anyhow!("{}", message))
        }
        SuggestLookup { found: 0, .. } => {
            eprintln!("No suggestions for '{}'", wanted);
            Ok(())
        }
        SuggestLookup { found, .. } => {
            tracing::debug!("[CLI] {} suggestion(s) received", found);
            render::suggestions(snapshot.suggestions(field).iter().map(String::as_str), output);
            Ok(())
        }
    }
}

/// Renders every buffered failure of `field`'s lookups and returns the last
/// message.
fn last_error(events: &mut broadcast::Receiver<DisplayEvent>, field: InputField) -> Option<String> {
    let operation = field.suggest_kind().to_string();
    let mut last = None;
    loop {
        match events.try_recv() {
            Ok(DisplayEvent::Error {
                operation: op,
                message,
            }) if op == operation => {
                render::error(&op, &message);
                last = Some(message);
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => return last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfind_core::geometry::Point;
    use wayfind_infrastructure::{InMemoryGeocoder, Place};

    fn gazetteer() -> Arc<dyn GeocodeClient> {
        Arc::new(InMemoryGeocoder::new(vec![
            Place::new("Starbucks", Point::wgs84(-117.18, 34.06)).with_category("POI"),
        ]))
    }

    async fn type_text(text: &str, interval_ms: u64) -> (Result<()>, Duration) {
        let started = tokio::time::Instant::now();
        let outcome = run(
            gazetteer(),
            WorkflowConfig::default(),
            text,
            InputField::Search,
            interval_ms,
            Output { json: false },
        )
        .await;
        (outcome, started.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_typing_finishes_once_final_lookup_lands() {
        // 200 ms between keys lets every prefix settle before the next one
        let (outcome, elapsed) = type_text("Sta", 200).await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_without_suggestions_does_not_wait_out_the_limit() {
        let (outcome, elapsed) = type_text("Sxq", 20).await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_text_returns_immediately() {
        let (outcome, elapsed) = type_text("   ", 50).await;
        assert!(outcome.is_ok());
        assert_eq!(elapsed, Duration::ZERO);
    }
}
