//! Configuration model.
//!
//! Every field has a default so a partial (or missing) config file still
//! yields a usable configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_GEOCODE_SERVICE_URL: &str =
    "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer";

pub const DEFAULT_CURRENT_LOCATION_LABEL: &str = "Current Location";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Quiet period for search-as-you-type, in milliseconds
    pub debounce_ms: u64,
    pub geocoder: GeocoderSettings,
    pub search: SearchSettings,
    pub feature_query: FeatureQuerySettings,
    pub logging: LogSettings,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            geocoder: GeocoderSettings::default(),
            search: SearchSettings::default(),
            feature_query: FeatureQuerySettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl WorkflowConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GeocoderSettings {
    pub service_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_GEOCODE_SERVICE_URL.to_string(),
            max_results: None,
            timeout_secs: 15,
            user_agent: format!("wayfind/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl GeocoderSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SearchSettings {
    /// Location-box entry that means "use the device location"
    pub current_location_label: String,
    /// Restrict search-box suggestions to points of interest
    pub poi_only_suggestions: bool,
    /// Reverse geocode each match to attach its address
    pub enrich_with_address: bool,
    /// Padding ratio applied to result extents for viewpoint requests
    pub viewpoint_padding: f64,
    /// Minimum viewpoint size around a single result, in map units
    pub min_viewpoint_size: f64,
    /// Identify tolerance around a tapped point, in map units
    pub identify_tolerance: f64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            current_location_label: DEFAULT_CURRENT_LOCATION_LABEL.to_string(),
            poi_only_suggestions: true,
            enrich_with_address: true,
            viewpoint_padding: 0.1,
            min_viewpoint_size: 0.01,
            identify_tolerance: 0.001,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FeatureQuerySettings {
    /// Attribute matched by feature queries
    pub field: String,
}

impl Default for FeatureQuerySettings {
    fn default() -> Self {
        Self {
            field: "STATE_NAME".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing` filter directive, e.g. "info" or "wayfind_application=debug"
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: WorkflowConfig = toml::from_str(
            r#"
            debounce_ms = 300

            [search]
            poi_only_suggestions = false
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert!(!config.search.poi_only_suggestions);
        assert!(config.search.enrich_with_address);
        assert_eq!(config.search.current_location_label, "Current Location");
        assert_eq!(config.geocoder.service_url, DEFAULT_GEOCODE_SERVICE_URL);
        assert_eq!(config.feature_query.field, "STATE_NAME");
    }

    #[test]
    fn test_default_round_trips_through_toml() {
        let config = WorkflowConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed: WorkflowConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
