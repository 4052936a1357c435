//! Feature table loaded from a GeoJSON FeatureCollection.
//!
//! GeoJSON coordinates are longitude/latitude, so every geometry is read as
//! WGS84. Supported geometry types: Point, Polygon, MultiPolygon (flattened
//! into one polygon with all rings).

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use wayfind_core::error::{Result, WayfindError};
use wayfind_core::geometry::{Geometry, Point};
use wayfind_core::search::{FeatureQuery, FeatureSource, ResultItem};

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<WireFeature>,
}

#[derive(Deserialize)]
struct WireFeature {
    #[serde(default)]
    id: Option<Value>,
    /// Kept raw so one unreadable geometry skips its feature only
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<BTreeMap<String, Value>>,
}

/// A position may carry altitude or extra members; only x and y are used.
type Position = Vec<f64>;

#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireGeometry {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
}

fn to_point(position: &[f64]) -> Option<Point> {
    match position {
        [x, y, ..] => Some(Point::wgs84(*x, *y)),
        _ => None,
    }
}

fn to_ring(positions: Vec<Position>) -> Option<Vec<Point>> {
    positions.iter().map(|p| to_point(p)).collect()
}

impl WireGeometry {
    fn into_geometry(self) -> Option<Geometry> {
        match self {
            WireGeometry::Point { coordinates } => to_point(&coordinates).map(Geometry::Point),
            WireGeometry::Polygon { coordinates } => {
                let rings = coordinates
                    .into_iter()
                    .map(to_ring)
                    .collect::<Option<Vec<_>>>()?;
                Some(Geometry::Polygon { rings })
            }
            WireGeometry::MultiPolygon { coordinates } => {
                let rings = coordinates
                    .into_iter()
                    .flatten()
                    .map(to_ring)
                    .collect::<Option<Vec<_>>>()?;
                Some(Geometry::Polygon { rings })
            }
        }
    }
}

fn read_geometry(raw: Value) -> std::result::Result<Geometry, String> {
    let wire: WireGeometry = serde_json::from_value(raw).map_err(|e| e.to_string())?;
    wire.into_geometry()
        .ok_or_else(|| "position with fewer than two coordinates".to_string())
}

/// In-memory feature table with attribute queries.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonFeatureTable {
    features: Vec<ResultItem>,
    label_field: Option<String>,
}

impl GeoJsonFeatureTable {
    /// Parses a FeatureCollection.
    ///
    /// Features without geometry, or with a geometry type other than Point,
    /// Polygon or MultiPolygon, are skipped with a warning.
    ///
    /// # Arguments
    ///
    /// * `text` - GeoJSON document
    /// * `label_field` - Property used as the display label (falls back to the feature id)
    pub fn from_geojson_str(text: &str, label_field: Option<&str>) -> Result<Self> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        if collection.kind != "FeatureCollection" {
            return Err(WayfindError::Serialization {
                format: "GeoJSON".to_string(),
                message: format!("expected FeatureCollection, found {}", collection.kind),
            });
        }

        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped = 0usize;
        let mut unreadable = 0usize;
        for (index, feature) in collection.features.into_iter().enumerate() {
            let geometry = match feature.geometry {
                None | Some(Value::Null) => {
                    skipped += 1;
                    continue;
                }
                Some(raw) => match read_geometry(raw) {
                    Ok(geometry) => geometry,
                    Err(reason) => {
                        tracing::debug!("[FeatureTable] feature {} unreadable: {}", index, reason);
                        unreadable += 1;
                        continue;
                    }
                },
            };
            let id = match feature.id {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => format!("feature-{index}"),
            };
            let properties = feature.properties.unwrap_or_default();
            let label = label_field
                .and_then(|field| properties.get(field))
                .and_then(Value::as_str)
                .map_or_else(|| id.clone(), str::to_string);

            let mut item = ResultItem::new(id, label, geometry);
            item.attributes = properties;
            features.push(item);
        }

        if skipped > 0 {
            tracing::warn!("[FeatureTable] skipped {} features without geometry", skipped);
        }
        if unreadable > 0 {
            tracing::warn!(
                "[FeatureTable] skipped {} features with unsupported or malformed geometry",
                unreadable
            );
        }

        Ok(Self {
            features,
            label_field: label_field.map(str::to_string),
        })
    }

    /// Reads and parses a GeoJSON file.
    pub async fn from_file(path: impl AsRef<Path>, label_field: Option<&str>) -> Result<Self> {
        let text = tokio::fs::read_to_string(path.as_ref()).await?;
        let table = Self::from_geojson_str(&text, label_field)?;
        tracing::info!(
            "[FeatureTable] loaded {} features from {}",
            table.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn label_field(&self) -> Option<&str> {
        self.label_field.as_deref()
    }
}

#[async_trait]
impl FeatureSource for GeoJsonFeatureTable {
    async fn query_features(&self, query: &FeatureQuery) -> Result<Vec<ResultItem>> {
        tracing::debug!("[FeatureTable] where {}", query.where_clause());
        Ok(self
            .features
            .iter()
            .filter(|feature| match feature.attributes.get(&query.field) {
                Some(Value::String(value)) => query.matches(value),
                Some(Value::Null) | None => false,
                Some(other) => query.matches(&other.to_string()),
            })
            .cloned()
            .collect())
    }
}
