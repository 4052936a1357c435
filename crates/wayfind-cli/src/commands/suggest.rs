use std::sync::Arc;

use anyhow::{Context, Result};

use wayfind_core::config::WorkflowConfig;
use wayfind_core::geometry::Point;
use wayfind_core::search::{GeocodeClient, SuggestParams};

use super::{Output, render};

/// One-shot suggestion request straight against the client, bypassing the
/// debouncer and the workflow's list handling.
pub async fn run(
    client: Arc<dyn GeocodeClient>,
    config: &WorkflowConfig,
    text: &str,
    categories: Vec<String>,
    near: Option<Point>,
    output: Output,
) -> Result<()> {
    let params = SuggestParams {
        preferred_location: near,
        categories,
        max_results: config.geocoder.max_results,
    };

    let found = client
        .suggest(text, &params)
        .await
        .with_context(|| format!("Suggest failed for '{}'", text))?;
    tracing::debug!("[CLI] {} suggestion(s) for '{}'", found.len(), text);

    if found.is_empty() && !output.json {
        eprintln!("No suggestions for '{}'", text);
    }
    render::raw_suggestions(&found, output);
    Ok(())
}
