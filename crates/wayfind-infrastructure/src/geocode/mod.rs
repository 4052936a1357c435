//! Geocoding client implementations.

pub mod arcgis;
pub mod memory;

pub use arcgis::ArcGisGeocoder;
pub use memory::{InMemoryGeocoder, Place};
