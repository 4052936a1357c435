//! Feature table implementations.

pub mod geojson_table;

pub use geojson_table::GeoJsonFeatureTable;
