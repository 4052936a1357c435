use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};

use wayfind_application::{DisplayEvent, ResultStream, SearchWorkflow};
use wayfind_core::config::WorkflowConfig;
use wayfind_core::operation::OperationKind;
use wayfind_core::search::GeocodeClient;
use wayfind_infrastructure::GeoJsonFeatureTable;

use super::{Output, finished, render, until, wait_limit};

pub async fn run(
    client: Arc<dyn GeocodeClient>,
    config: WorkflowConfig,
    table: &Path,
    text: &str,
    output: Output,
) -> Result<()> {
    let features =
        GeoJsonFeatureTable::from_file(table, Some(config.feature_query.field.as_str()))
            .await
            .with_context(|| format!("Failed to load feature table {}", table.display()))?;
    tracing::info!(
        "[CLI] Loaded {} feature(s) from {}",
        features.len(),
        table.display()
    );

    let limit = wait_limit(&config);
    let workflow = SearchWorkflow::spawn(client, Some(Arc::new(features)), config);
    let mut events = workflow.subscribe();

    workflow.query_features(text)?;

    let outcome = until(&mut events, limit, |event| match event {
        DisplayEvent::ResultsReplaced {
            stream: ResultStream::Features,
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
        DisplayEvent::SelectionChanged { count, extent } => {
            render::selection(count, extent.as_ref());
            None
        }
        DisplayEvent::StatusChanged(change) => {
            render::status(&change);
            finished(&change, OperationKind::FeatureQuery)
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
        None => bail!("Timed out waiting for feature query"),
    }
}
