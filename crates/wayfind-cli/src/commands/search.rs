use std::sync::Arc;

use anyhow::{Result, anyhow, bail};

use wayfind_application::{DisplayEvent, ResultStream, SearchRequest, SearchWorkflow};
use wayfind_core::config::WorkflowConfig;
use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::operation::OperationKind;
use wayfind_core::search::GeocodeClient;

use super::{Output, finished, render, until, wait_limit};

pub struct SearchOptions {
    pub text: String,
    pub near: Option<String>,
    pub within: Option<Envelope>,
    pub device_location: Option<Point>,
}

pub async fn run(
    client: Arc<dyn GeocodeClient>,
    config: WorkflowConfig,
    options: SearchOptions,
    output: Output,
) -> Result<()> {
    // A blank submit only resets status, which may already be idle
    if options.text.trim().is_empty() {
        eprintln!("Nothing to search for");
        return Ok(());
    }

    let limit = wait_limit(&config);
    let workflow = SearchWorkflow::spawn(client, None, config);
    let mut events = workflow.subscribe();

    if let Some(point) = options.device_location {
        workflow.set_device_location(point)?;
    }

    let mut request = SearchRequest::new(options.text);
    if let Some(near) = options.near {
        request = request.near(near);
    }
    if let Some(area) = options.within {
        workflow.set_visible_area(area)?;
        request = request.within_visible_area();
    }
    workflow.submit(request)?;

    let outcome = until(&mut events, limit, |event| match event {
        DisplayEvent::ResultsReplaced {
            stream: ResultStream::Search,
            results,
        } => {
            if !results.is_empty() {
                render::results(&results, output);
            }
            None
        }
        DisplayEvent::NoMatches { query, .. } => {
            render::no_matches(&query);
            None
        }
        DisplayEvent::ViewpointRequested(extent) => {
            render::viewpoint(&extent);
            None
        }
        DisplayEvent::StatusChanged(change) => {
            render::status(&change);
            finished(&change, OperationKind::Search)
        }
        DisplayEvent::Error { operation, message } => {
            render::error(&operation, &message);
            Some(Err(anyhow!("{}", message)))
        }
        _ => None,
    })
    .await;

    workflow.shutdown().await;
    match outcome? {
        Some(()) => Ok(()),
        None => bail!("Timed out waiting for search results"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wayfind_infrastructure::{InMemoryGeocoder, Place};

    fn options(text: &str) -> SearchOptions {
        SearchOptions {
            text: text.to_string(),
            near: None,
            within: None,
            device_location: None,
        }
    }

    async fn search(text: &str) -> (Result<()>, Duration) {
        let client: Arc<dyn GeocodeClient> = Arc::new(InMemoryGeocoder::new(vec![Place::new(
            "Redlands Bowl",
            Point::wgs84(-117.1817, 34.0536),
        )]));
        let started = tokio::time::Instant::now();
        let outcome = run(
            client,
            WorkflowConfig::default(),
            options(text),
            Output { json: false },
        )
        .await;
        (outcome, started.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_text_returns_without_waiting() {
        let (outcome, elapsed) = search("   ").await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert_eq!(elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_finishes_on_complete_status() {
        let (outcome, elapsed) = search("bowl").await;
        assert!(outcome.is_ok(), "{outcome:?}");
        assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    }
}
