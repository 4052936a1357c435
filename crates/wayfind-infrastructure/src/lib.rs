//! Infrastructure adapters for wayfind: geocoding clients, feature tables
//! and configuration storage.

pub mod config_service;
pub mod feature;
pub mod geocode;
pub mod paths;

pub use crate::config_service::ConfigService;
pub use crate::feature::GeoJsonFeatureTable;
pub use crate::geocode::{ArcGisGeocoder, InMemoryGeocoder, Place};
pub use crate::paths::WayfindPaths;
