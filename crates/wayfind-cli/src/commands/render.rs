//! Terminal rendering of display events.
//!
//! Results go to stdout (as text or JSON); status lines and notices go to
//! stderr so that stdout stays pipeable.

use colored::Colorize;

use wayfind_core::geometry::Envelope;
use wayfind_core::search::{ATTR_MATCH_ADDRESS, ResultSet, Suggestion};
use wayfind_core::status::{OperationStatus, StatusChange};

use super::Output;

pub fn results(set: &ResultSet, output: Output) {
    if output.json {
        match serde_json::to_string_pretty(set) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("[CLI] Failed to serialize results: {}", e),
        }
        return;
    }

    for (index, item) in set.items().iter().enumerate() {
        let location = item
            .location()
            .map(|p| format!("({:.5}, {:.5})", p.x, p.y))
            .unwrap_or_default();
        println!(
            "{:>3}. {} {}",
            index + 1,
            item.label.bold(),
            location.dimmed()
        );
        if let Some(address) = item.attribute_str(ATTR_MATCH_ADDRESS) {
            println!("     {}", address.cyan());
        }
    }
}

pub fn no_matches(query: &str) {
    eprintln!("{}", format!("No matches for '{}'", query).yellow());
}

pub fn suggestions<'a>(labels: impl IntoIterator<Item = &'a str>, output: Output) {
    let labels: Vec<&str> = labels.into_iter().collect();
    if output.json {
        println!("{}", serde_json::Value::from(labels));
        return;
    }
    for label in labels {
        println!("  {}", label.green());
    }
}

pub fn raw_suggestions(found: &[Suggestion], output: Output) {
    if output.json {
        match serde_json::to_string_pretty(found) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!("[CLI] Failed to serialize suggestions: {}", e),
        }
        return;
    }
    for suggestion in found {
        let marker = if suggestion.is_collection { " [category]" } else { "" };
        println!("  {}{}", suggestion.label.green(), marker.dimmed());
    }
}

pub fn selection(count: usize, extent: Option<&Envelope>) {
    match extent {
        Some(extent) => eprintln!("{} selected, extent {}", count.to_string().bold(), extent),
        None => eprintln!("{} selected", count.to_string().bold()),
    }
}

pub fn viewpoint(extent: &Envelope) {
    eprintln!("{} {}", "Viewpoint:".dimmed(), extent);
}

pub fn status(change: &StatusChange) {
    let label = change.to.to_string();
    let label = match change.to {
        OperationStatus::Complete => label.green(),
        OperationStatus::Failed => label.red(),
        OperationStatus::InProgress => label.yellow(),
        OperationStatus::Idle => label.dimmed(),
    };
    eprintln!("{} {}", format!("[{}]", change.kind).dimmed(), label);
}

pub fn error(operation: &str, message: &str) {
    eprintln!("{} {}", format!("{} error:", operation).red().bold(), message);
}
