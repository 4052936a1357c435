use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use colored::Colorize;

use wayfind_application::{DisplayEvent, SearchWorkflow};
use wayfind_core::config::WorkflowConfig;
use wayfind_core::geometry::Point;
use wayfind_core::search::GeocodeClient;

use super::{Output, render, until, wait_limit};

pub async fn run(
    client: Arc<dyn GeocodeClient>,
    config: WorkflowConfig,
    point: Point,
    output: Output,
) -> Result<()> {
    let limit = wait_limit(&config);
    let workflow = SearchWorkflow::spawn(client, None, config);
    let mut events = workflow.subscribe();

    workflow.reverse_lookup(point)?;

    let outcome = until(&mut events, limit, |event| match event {
        DisplayEvent::AddressResolved { point, address } => Some(Ok((point, address))),
        DisplayEvent::Error { operation, message } => {
            render::error(&operation, &message);
            Some(Err(anyhow!("{}", message)))
        }
        _ => None,
    })
    .await;
    workflow.shutdown().await;

    let Some((point, address)) = outcome? else {
        bail!("Timed out waiting for reverse lookup");
    };

    if output.json {
        println!(
            "{}",
            serde_json::json!({ "x": point.x, "y": point.y, "address": address })
        );
    } else {
        match address {
            Some(address) => println!("{}", address.bold()),
            None => eprintln!("{}", format!("No address found near {}", point).yellow()),
        }
    }
    Ok(())
}
