//! Pipeline driver: urban, rural and electoral layers with independent
//! per-layer status.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use serde::Serialize;

use crate::common;
use crate::config::PipelineConfig;
use crate::geom::Geometries;
use crate::io;
use crate::layer::{self, SettlementType};

/// Census-layer output properties: geocode, display names, deprivation
/// ratios, composite index and the population breakdowns for both years.
const CENSUS_PROPERTIES: [&str; 31] = [
    "CVEGEO", "TIPO", "NOM_MUN_OFICIAL", "NOM_LOC", "CVE_AGEB", "CVE_MZA",
    "CAR_EDU_20", "CAR_SALUD_20", "CAR_VIV_20", "CAR_SERV_20", "CAR_ALIM_20", "CAR_POBREZA_20",
    "SITS_INDEX",
    "P20_TOT", "P20_FEM", "P20_MAS", "P20_IND", "P20_AFRO", "P20_DISC", "P20_JEFAS",
    "P20_NINOS", "P20_MAYORES",
    "P25_TOT", "P25_FEM", "P25_MAS", "P25_IND", "P25_AFRO", "P25_DISC", "P25_JEFAS",
    "P25_NINOS", "P25_MAYORES",
];

/// Electoral-layer output properties.
const ELECTORAL_PROPERTIES: [&str; 6] = ["SECCION", "morena", "pan", "pri", "mc", "GANADOR"];

/// Outcome of one layer run.
#[derive(Debug, Serialize)]
pub struct LayerStatus {
    pub layer: String,
    pub ok: bool,
    pub features: usize,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl LayerStatus {
    fn succeeded(layer: &str, features: usize, output: &Path) -> Self {
        Self {
            layer: layer.into(),
            ok: true,
            features,
            output: Some(output.display().to_string()),
            error: None,
        }
    }

    fn failed(layer: &str, error: &anyhow::Error) -> Self {
        Self {
            layer: layer.into(),
            ok: false,
            features: 0,
            output: None,
            error: Some(format!("{error:#}")),
        }
    }
}

/// Full run manifest, persisted next to the layer artifacts so a consumer
/// can tell a failed layer apart from one that was never generated.
#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub municipality: String,
    pub municipality_name: Option<String>,
    pub layers: Vec<LayerStatus>,
}

impl PipelineReport {
    /// True when at least one layer produced an artifact.
    pub fn any_succeeded(&self) -> bool {
        self.layers.iter().any(|l| l.ok)
    }
}

/// Run the full pipeline for one municipality. Layer failures are recorded
/// and reported; they never abort the remaining layers.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    common::ensure_dir_exists(&config.out_dir)?;

    let mut report = PipelineReport {
        municipality: config.municipality.clone(),
        municipality_name: None,
        layers: Vec::new(),
    };

    // Urban layer; its extent also drives the electoral trim below.
    println!("[pipeline] urban layer for municipality {}...", config.municipality);
    let mut urban_bounds = None;
    match layer::build_layer(
        &config.urban_shapes(),
        &config.urban_table(),
        SettlementType::Urban,
        &config.municipality,
    ) {
        Ok(urban) => {
            report.municipality_name = Some(urban.municipality_name.clone());
            urban_bounds = urban.geoms.bounds();
            report.layers.push(write_census_layer(&urban, &config.urban_output()));
        }
        Err(e) => {
            eprintln!("[pipeline] urban layer failed: {e:#}");
            report.layers.push(LayerStatus::failed("urban", &e));
        }
    }

    println!("[pipeline] rural layer for municipality {}...", config.municipality);
    match layer::build_layer(
        &config.rural_shapes(),
        &config.rural_table(),
        SettlementType::Rural,
        &config.municipality,
    ) {
        Ok(rural) => {
            if report.municipality_name.is_none() {
                report.municipality_name = Some(rural.municipality_name.clone());
            }
            report.layers.push(write_census_layer(&rural, &config.rural_output()));
        }
        Err(e) => {
            eprintln!("[pipeline] rural layer failed: {e:#}");
            report.layers.push(LayerStatus::failed("rural", &e));
        }
    }

    println!("[pipeline] electoral layer...");
    match layer::build_electoral_layer(&config.section_shapes(), &config.votes_table(), urban_bounds) {
        Ok(electoral) => {
            println!("[pipeline] {} section(s) joined inside the urban extent", electoral.len());
            report.layers.push(write_electoral_layer(&electoral, &config.electoral_output()));
        }
        Err(e) => {
            eprintln!("[pipeline] electoral layer failed: {e:#}");
            report.layers.push(LayerStatus::failed("electoral", &e));
        }
    }

    let manifest = serde_json::to_string_pretty(&report)
        .context("[pipeline] Failed to serialize run manifest")?;
    fs::write(config.manifest_output(), manifest)
        .with_context(|| format!("[pipeline] Failed to write {}", config.manifest_output().display()))?;

    Ok(report)
}

fn write_census_layer(layer: &layer::GeoLayer, path: &Path) -> LayerStatus {
    let name = match layer.kind {
        SettlementType::Urban => "urban",
        SettlementType::Rural => "rural",
    };
    if layer.is_empty() {
        eprintln!("[pipeline] {name} join matched no units; writing an empty layer");
    }
    match write_layer(&layer.data, &layer.geoms, path, &CENSUS_PROPERTIES) {
        Ok(features) => LayerStatus::succeeded(name, features, path),
        Err(e) => {
            eprintln!("[pipeline] {name} write failed: {e:#}");
            LayerStatus::failed(name, &e)
        }
    }
}

fn write_electoral_layer(layer: &layer::ElectoralLayer, path: &Path) -> LayerStatus {
    match write_layer(&layer.data, &layer.geoms, path, &ELECTORAL_PROPERTIES) {
        Ok(features) => LayerStatus::succeeded("electoral", features, path),
        Err(e) => {
            eprintln!("[pipeline] electoral write failed: {e:#}");
            LayerStatus::failed("electoral", &e)
        }
    }
}

/// Reproject to WGS84 and persist one layer; returns the feature count.
fn write_layer(
    data: &DataFrame,
    geoms: &Geometries,
    path: &Path,
    properties: &[&str],
) -> Result<usize> {
    let shapes = geoms.to_wgs84()?;
    io::write_geojson_layer(path, data, &shapes, properties)?;
    Ok(shapes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_fail_every_layer_but_not_the_run() {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let config = PipelineConfig::new("032", data.path(), out.path());

        let report = run_pipeline(&config).unwrap();

        assert_eq!(report.layers.len(), 3);
        assert!(!report.any_succeeded());
        assert!(report.layers.iter().all(|l| l.error.is_some()));
        assert!(report.municipality_name.is_none());

        // The manifest still names every failed layer.
        let raw = fs::read(config.manifest_output()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["layers"].as_array().unwrap().len(), 3);
        assert_eq!(value["municipality"], "032");
    }
}
