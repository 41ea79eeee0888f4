//! GeoJSON FeatureCollection output.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use polars::frame::DataFrame;
use polars::prelude::{Column, DataType};
use serde_json::{json, Map, Value};

/// Serialize one layer as a GeoJSON FeatureCollection on disk.
///
/// `properties` lists the columns to carry on each feature; columns missing
/// from the frame are skipped, null cells become JSON null. Geometries must
/// already be in lon/lat degrees.
pub(crate) fn write_geojson_layer(
    path: &Path,
    data: &DataFrame,
    shapes: &[MultiPolygon<f64>],
    properties: &[&str],
) -> Result<()> {
    let collection = layer_to_geojson(data, shapes, properties)?;
    let file = File::create(path)
        .with_context(|| format!("[io::geojson] Failed to create {}", path.display()))?;
    serde_json::to_writer(BufWriter::new(file), &collection)
        .with_context(|| format!("[io::geojson] Failed to write {}", path.display()))?;
    Ok(())
}

/// Build the FeatureCollection value for a layer.
pub(crate) fn layer_to_geojson(
    data: &DataFrame,
    shapes: &[MultiPolygon<f64>],
    properties: &[&str],
) -> Result<Value> {
    if data.height() != shapes.len() {
        return Err(anyhow!(
            "[io::geojson] Row count ({}) does not match geometry count ({})",
            data.height(),
            shapes.len()
        ));
    }

    let mut features = Vec::with_capacity(shapes.len());
    for (idx, mp) in shapes.iter().enumerate() {
        let mut props = Map::new();
        for name in properties {
            if let Ok(col) = data.column(name) {
                props.insert((*name).to_string(), cell_to_json(col, idx));
            }
        }
        features.push(json!({
            "type": "Feature",
            "geometry": multipolygon_to_geojson(mp),
            "properties": props,
        }));
    }

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

/// Extract one cell as JSON, matched on the column dtype.
fn cell_to_json(col: &Column, idx: usize) -> Value {
    match col.dtype() {
        DataType::String => col.str().ok()
            .and_then(|s| s.get(idx).map(|v| json!(v)))
            .unwrap_or(Value::Null),
        DataType::Float64 => col.f64().ok()
            .and_then(|s| s.get(idx).map(|v| json!(v)))
            .unwrap_or(Value::Null),
        DataType::Int64 => col.i64().ok()
            .and_then(|s| s.get(idx).map(|v| json!(v)))
            .unwrap_or(Value::Null),
        DataType::UInt32 => col.u32().ok()
            .and_then(|s| s.get(idx).map(|v| json!(v)))
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// Convert a MultiPolygon to a GeoJSON geometry value.
fn multipolygon_to_geojson(mp: &MultiPolygon<f64>) -> Value {
    let mut polygons_json = Vec::new();
    for polygon in mp.0.iter() {
        let exterior: Vec<Vec<f64>> = polygon.exterior().coords()
            .map(|c| vec![c.x, c.y])
            .collect();
        let mut rings = vec![exterior];
        for interior in polygon.interiors() {
            rings.push(interior.coords().map(|c| vec![c.x, c.y]).collect());
        }
        polygons_json.push(rings);
    }
    json!({
        "type": "MultiPolygon",
        "coordinates": polygons_json,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)]),
            vec![],
        )])
    }

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("CVEGEO".into(), vec!["300320001"]),
            Column::new("SITS_INDEX".into(), vec![0.25f64]),
        ])
        .unwrap()
    }

    #[test]
    fn features_carry_the_requested_properties() {
        let value = layer_to_geojson(
            &frame(),
            &[square(0.0, 0.0)],
            &["CVEGEO", "SITS_INDEX", "NOT_A_COLUMN"],
        )
        .unwrap();

        assert_eq!(value["type"], "FeatureCollection");
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);

        let props = features[0]["properties"].as_object().unwrap();
        assert_eq!(props["CVEGEO"], json!("300320001"));
        assert_eq!(props["SITS_INDEX"], json!(0.25));
        assert!(!props.contains_key("NOT_A_COLUMN"));

        let geometry = &features[0]["geometry"];
        assert_eq!(geometry["type"], "MultiPolygon");
        // One polygon, one ring, five closed coordinates.
        assert_eq!(geometry["coordinates"][0][0].as_array().unwrap().len(), 5);
    }

    #[test]
    fn row_and_shape_counts_must_match() {
        let result = layer_to_geojson(&frame(), &[], &["CVEGEO"]);
        assert!(result.is_err());
    }

    #[test]
    fn writes_a_parseable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.geojson");
        write_geojson_layer(&path, &frame(), &[square(0.0, 0.0)], &["CVEGEO"]).unwrap();

        let raw = std::fs::read(&path).unwrap();
        let value: Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 1);
    }
}
