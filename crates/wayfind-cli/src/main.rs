use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use wayfind_core::config::WorkflowConfig;
use wayfind_core::geometry::{Envelope, Point, SpatialReference};
use wayfind_core::search::GeocodeClient;
use wayfind_infrastructure::{ArcGisGeocoder, ConfigService, InMemoryGeocoder};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "wayfind")]
#[command(version, about = "wayfind - search, geocode and feature-query workflow", long_about = None)]
struct Cli {
    /// Config file (defaults to the per-user wayfind config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Answer from a local gazetteer JSON file instead of the geocode service
    #[arg(long, global = true, value_name = "GAZETTEER.json")]
    offline: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (overrides the config file)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Forward geocode a place, address or category
    Search {
        text: String,

        /// Location to search around ("Current Location" uses --device-location)
        #[arg(long)]
        near: Option<String>,

        /// Only return matches inside XMIN,YMIN,XMAX,YMAX (WGS84)
        #[arg(long, value_parser = parse_envelope, allow_hyphen_values = true)]
        within: Option<Envelope>,

        /// Device location as LON,LAT
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        device_location: Option<Point>,
    },
    /// One-shot type-ahead suggestions for partial text
    Suggest {
        text: String,

        /// Restrict to a category (repeatable), e.g. POI
        #[arg(long = "category")]
        categories: Vec<String>,

        /// Rank suggestions around LON,LAT
        #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
        near: Option<Point>,
    },
    /// Reverse geocode LON,LAT into an address
    Reverse {
        #[arg(value_parser = parse_point, allow_hyphen_values = true)]
        point: Point,
    },
    /// Query a GeoJSON feature table and select every match
    QueryFeatures {
        text: String,

        /// GeoJSON FeatureCollection to query
        #[arg(long)]
        table: PathBuf,

        /// Attribute to match (defaults to the configured field)
        #[arg(long)]
        field: Option<String>,
    },
    /// Simulate typing TEXT one character at a time through the debouncer
    Type {
        text: String,

        #[arg(long, value_enum, default_value_t = Field::Search)]
        field: Field,

        /// Delay between keystrokes
        #[arg(long, default_value_t = 50)]
        interval_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Field {
    Search,
    Location,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    logging::init_logging(&config.logging, cli.log_level.as_deref(), cli.json_logs)?;

    let client = build_client(&config, cli.offline.as_ref()).await?;
    let output = commands::Output { json: cli.json };

    match cli.command {
        Commands::Search {
            text,
            near,
            within,
            device_location,
        } => {
            let options = commands::search::SearchOptions {
                text,
                near,
                within,
                device_location,
            };
            commands::search::run(client, config, options, output).await?
        }
        Commands::Suggest {
            text,
            categories,
            near,
        } => commands::suggest::run(client, &config, &text, categories, near, output).await?,
        Commands::Reverse { point } => commands::reverse::run(client, config, point, output).await?,
        Commands::QueryFeatures { text, table, field } => {
            let mut config = config;
            if let Some(field) = field {
                config.feature_query.field = field;
            }
            commands::features::run(client, config, &table, &text, output).await?
        }
        Commands::Type {
            text,
            field,
            interval_ms,
        } => {
            commands::type_ahead::run(client, config, &text, field.into(), interval_ms, output)
                .await?
        }
    }

    Ok(())
}

impl From<Field> for wayfind_application::InputField {
    fn from(field: Field) -> Self {
        match field {
            Field::Search => Self::Search,
            Field::Location => Self::Location,
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<WorkflowConfig> {
    let service = match path {
        Some(path) => ConfigService::with_path(path),
        None => ConfigService::new().context("Failed to resolve config directory")?,
    };
    service
        .load()
        .with_context(|| format!("Failed to load config from {}", service.path().display()))
}

async fn build_client(
    config: &WorkflowConfig,
    offline: Option<&PathBuf>,
) -> Result<Arc<dyn GeocodeClient>> {
    match offline {
        Some(path) => {
            let geocoder = InMemoryGeocoder::from_json_file(path)
                .await
                .with_context(|| format!("Failed to load gazetteer {}", path.display()))?;
            tracing::info!("[CLI] Offline mode: {} place(s)", geocoder.places().len());
            Ok(Arc::new(geocoder))
        }
        None => {
            let geocoder = ArcGisGeocoder::new(&config.geocoder)?;
            tracing::info!("[CLI] Using geocode service {}", geocoder.service_url());
            Ok(Arc::new(geocoder))
        }
    }
}

fn parse_point(s: &str) -> Result<Point, String> {
    let coords = parse_coords(s, 2)?;
    Ok(Point::wgs84(coords[0], coords[1]))
}

fn parse_envelope(s: &str) -> Result<Envelope, String> {
    let c = parse_coords(s, 4)?;
    Ok(Envelope::new(c[0], c[1], c[2], c[3], SpatialReference::Wgs84))
}

fn parse_coords(s: &str, expected: usize) -> Result<Vec<f64>, String> {
    let coords = s
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{}': {}", s, e))?;
    if coords.len() != expected {
        return Err(format!(
            "expected {} comma-separated numbers, got {}",
            expected,
            coords.len()
        ));
    }
    Ok(coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let point = parse_point("-117.19, 34.05").unwrap();
        assert_eq!(point.x, -117.19);
        assert_eq!(point.y, 34.05);
    }

    #[test]
    fn test_parse_envelope_normalizes_corners() {
        let envelope = parse_envelope("-116,35,-118,33").unwrap();
        assert_eq!(envelope.xmin, -118.0);
        assert_eq!(envelope.ymax, 35.0);
    }

    #[test]
    fn test_parse_rejects_wrong_arity() {
        assert!(parse_point("1,2,3").is_err());
        assert!(parse_envelope("nope").is_err());
    }

    #[test]
    fn test_cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from([
            "wayfind",
            "search",
            "coffee",
            "--near",
            "Redlands, CA",
            "--offline",
            "places.json",
        ])
        .unwrap();
        assert_eq!(cli.offline, Some(PathBuf::from("places.json")));
        assert!(matches!(
            cli.command,
            Commands::Search { ref near, .. } if near.as_deref() == Some("Redlands, CA")
        ));
    }
}
