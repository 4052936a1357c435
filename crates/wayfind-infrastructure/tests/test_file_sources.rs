use std::fs;

use tempfile::TempDir;
use wayfind_core::geometry::Point;
use wayfind_core::search::{FeatureQuery, FeatureSource, GeocodeClient, SearchParams};
use wayfind_infrastructure::{GeoJsonFeatureTable, InMemoryGeocoder, Place};

#[tokio::test]
async fn test_gazetteer_loads_from_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("places.json");

    let places = vec![
        Place::new("Esri Campus", Point::wgs84(-117.1957, 34.0564))
            .with_category("POI")
            .with_address("380 New York St, Redlands"),
        Place::new("Redlands Bowl", Point::wgs84(-117.1817, 34.0536)).with_category("POI"),
    ];
    fs::write(&path, serde_json::to_string(&places).unwrap()).unwrap();

    let geocoder = InMemoryGeocoder::from_json_file(&path)
        .await
        .expect("Should load gazetteer");
    assert_eq!(geocoder.places(), places.as_slice());

    let results = geocoder
        .search("redlands", &SearchParams::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label, "Redlands Bowl");
}

#[tokio::test]
async fn test_gazetteer_missing_file_is_io_error() {
    let temp_dir = TempDir::new().unwrap();
    let err = InMemoryGeocoder::from_json_file(temp_dir.path().join("missing.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, wayfind_core::WayfindError::Io { .. }));
}

#[tokio::test]
async fn test_feature_table_loads_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("states.geojson");
    fs::write(
        &path,
        r#"{
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "STATE_NAME": "Colorado" },
                  "geometry": { "type": "Polygon", "coordinates": [[[-109.05, 37.0], [-102.04, 37.0], [-102.04, 41.0], [-109.05, 41.0], [-109.05, 37.0]]] } },
                { "type": "Feature", "properties": { "STATE_NAME": "California" },
                  "geometry": { "type": "Point", "coordinates": [-119.4, 36.8] } }
            ]
        }"#,
    )
    .unwrap();

    let table = GeoJsonFeatureTable::from_file(&path, Some("STATE_NAME"))
        .await
        .expect("Should load feature table");
    assert_eq!(table.len(), 2);

    let hits = table
        .query_features(&FeatureQuery::new("STATE_NAME", "colo"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].label, "Colorado");
}
