//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so that results on stdout stay pipeable. `RUST_LOG`
//! wins over both `--log-level` and the config file.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use wayfind_core::config::LogSettings;

pub fn init_logging(settings: &LogSettings, level: Option<&str>, json: bool) -> Result<()> {
    let default_level = level.unwrap_or(&settings.level);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("Invalid log filter '{}': {}", default_level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if json || settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow!("Failed to install log subscriber: {}", e))
}
