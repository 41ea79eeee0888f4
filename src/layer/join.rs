//! Geo-tabular join: one geometry layer merged with one census table on a
//! constructed geocode key.

use std::path::Path;

use ahash::AHashSet;
use anyhow::{Context, Result};
use geo::MultiPolygon;
use polars::frame::DataFrame;
use polars::prelude::*;

use super::{GeoLayer, SettlementType};
use crate::common;
use crate::geom::{crs_from_shapefile, Geometries, SourceCrs};
use crate::indicators;
use crate::schema;

/// Fallback display name when no census row matches the municipality filter.
const UNKNOWN_MUNICIPALITY: &str = "Desconocido";

/// Placeholder block code used by the census for block-group aggregate rows.
const PLACEHOLDER_BLOCK: &str = "000";

/// Build one census layer: read the shapefile and attribute table, filter to
/// the target municipality, join on the constructed geocode, and derive
/// indicators and population columns.
pub(crate) fn build_layer(
    shp_path: &Path,
    table_path: &Path,
    kind: SettlementType,
    municipality: &str,
) -> Result<GeoLayer> {
    let items = common::read_shapefile(shp_path)?;
    let table = common::read_table(table_path)?;
    let crs = crs_from_shapefile(shp_path);

    // Geometry side: CVEGEO key, plus NOMGEO locality names for rural layers.
    let mut shapes = Vec::with_capacity(items.len());
    let mut geom_keys = Vec::with_capacity(items.len());
    let mut geom_names = Vec::with_capacity(items.len());
    for (shape, record) in items {
        shapes.push(common::shape_to_multipolygon(shape)?);
        geom_keys.push(common::character_field(&record, "CVEGEO")?);
        geom_names.push(common::character_field(&record, "NOMGEO").unwrap_or_default());
    }

    join_layer(shapes, geom_keys, geom_names, table, kind, municipality, crs)
}

/// Join pre-parsed geometries with a census table. Split from [`build_layer`]
/// so the merge semantics can be exercised without shapefile fixtures.
fn join_layer(
    shapes: Vec<MultiPolygon<f64>>,
    geom_keys: Vec<String>,
    geom_names: Vec<String>,
    mut table: DataFrame,
    kind: SettlementType,
    municipality: &str,
    crs: SourceCrs,
) -> Result<GeoLayer> {
    let mask = municipality_mask(&table, kind, municipality)?;
    table = table.filter(&mask)?;

    let municipality_name =
        first_str(&table, "NOM_MUN").unwrap_or_else(|| UNKNOWN_MUNICIPALITY.to_string());
    println!("   [layer::join] detected municipality: {municipality_name}");

    let geocodes = build_geocodes(&table, kind)?;
    warn_duplicate_geocodes(&geocodes, kind);
    table.replace_or_add("CVEGEO".into(), Series::new("CVEGEO".into(), geocodes))?;

    let report = schema::normalize_census(&mut table)?;
    for (alias, canonical) in &report.renamed {
        println!("   [schema] renamed legacy column {alias} -> {canonical}");
    }
    if !report.absent.is_empty() {
        println!(
            "   [schema] {} absent field(s) zero-filled: {:?}",
            report.absent.len(),
            report.absent
        );
    }
    indicators::compute_indicators(&mut table)?;

    // Inner join against the geometry keys. Units present on only one side
    // are dropped; the idx sort keeps attribute rows aligned with shapes.
    let geom_df = DataFrame::new(vec![
        Column::new("CVEGEO".into(), geom_keys),
        Column::new("NOMGEO".into(), geom_names),
    ])?
    .with_row_index("idx".into(), None)?;

    let mut joined = geom_df
        .inner_join(&table, ["CVEGEO"], ["CVEGEO"])?
        .sort(["idx"], SortMultipleOptions::default())?;

    let picked: Vec<usize> = joined.column("idx")?
        .u32()?
        .into_no_null_iter()
        .map(|v| v as usize)
        .collect();
    let joined_shapes: Vec<MultiPolygon<f64>> =
        picked.iter().map(|&i| shapes[i].clone()).collect();

    super::project::add_population_columns(&mut joined)?;
    add_display_columns(&mut joined, kind, &municipality_name)?;

    Ok(GeoLayer {
        kind,
        municipality_name,
        data: joined,
        geoms: Geometries::new(joined_shapes, crs),
    })
}

/// Row filter for the target municipality. Urban tables match the code
/// exactly and drop placeholder block rows; rural tables match by suffix to
/// absorb code-padding differences across data vintages.
fn municipality_mask(
    table: &DataFrame,
    kind: SettlementType,
    municipality: &str,
) -> Result<BooleanChunked> {
    let mun = table.column("MUN")
        .context("[layer::join] attribute table is missing the MUN column")?
        .str()?;
    match kind {
        SettlementType::Urban => {
            let mza = table.column("MZA")
                .context("[layer::join] urban attribute table is missing the MZA column")?
                .str()?;
            Ok(mun.into_iter()
                .zip(mza.into_iter())
                .map(|(m, z)| {
                    Some(m == Some(municipality) && z.is_some_and(|z| z != PLACEHOLDER_BLOCK))
                })
                .collect())
        }
        SettlementType::Rural => Ok(mun.into_iter()
            .map(|m| Some(m.is_some_and(|m| m.ends_with(municipality))))
            .collect()),
    }
}

/// Concatenate the geocode parts with no separators. Urban keys go down to
/// the block level; rural keys stop at the locality.
fn build_geocodes(table: &DataFrame, kind: SettlementType) -> Result<Vec<String>> {
    let parts: &[&str] = match kind {
        SettlementType::Urban => &["ENTIDAD", "MUN", "LOC", "AGEB", "MZA"],
        SettlementType::Rural => &["ENTIDAD", "MUN", "LOC"],
    };

    let mut columns = Vec::with_capacity(parts.len());
    for part in parts {
        let values: Vec<String> = table.column(part)
            .with_context(|| format!("[layer::join] attribute table is missing the {part} column"))?
            .str()?
            .into_iter()
            .map(|opt| opt.unwrap_or("").to_string())
            .collect();
        columns.push(values);
    }

    Ok((0..table.height())
        .map(|i| columns.iter().map(|c| c[i].as_str()).collect::<String>())
        .collect())
}

fn warn_duplicate_geocodes(geocodes: &[String], kind: SettlementType) {
    let mut seen = AHashSet::with_capacity(geocodes.len());
    let duplicates = geocodes.iter().filter(|g| !seen.insert(g.as_str())).count();
    if duplicates > 0 {
        eprintln!(
            "   [layer::join] {} duplicate {} geocode(s); joined rows will repeat",
            duplicates,
            kind.label()
        );
    }
}

fn first_str(df: &DataFrame, name: &str) -> Option<String> {
    let ca = df.column(name).ok()?.str().ok()?;
    if ca.is_empty() {
        return None;
    }
    ca.get(0).map(|s| s.to_string())
}

/// Columns the dashboard filters on: settlement type, display names and the
/// AGEB/block sub-keys.
fn add_display_columns(
    df: &mut DataFrame,
    kind: SettlementType,
    municipality_name: &str,
) -> Result<()> {
    let height = df.height();
    df.replace_or_add("TIPO".into(), Series::new("TIPO".into(), vec![kind.label(); height]))?;
    df.replace_or_add(
        "NOM_MUN_OFICIAL".into(),
        Series::new("NOM_MUN_OFICIAL".into(), vec![municipality_name; height]),
    )?;

    match kind {
        SettlementType::Urban => {
            let nom_loc = format!("{municipality_name} (Cabecera)");
            df.replace_or_add(
                "NOM_LOC".into(),
                Series::new("NOM_LOC".into(), vec![nom_loc.as_str(); height]),
            )?;
            let ageb = string_column(df, "AGEB", "SN")?;
            df.replace_or_add("CVE_AGEB".into(), Series::new("CVE_AGEB".into(), ageb))?;
            let mza = string_column(df, "MZA", PLACEHOLDER_BLOCK)?;
            df.replace_or_add("CVE_MZA".into(), Series::new("CVE_MZA".into(), mza))?;
        }
        SettlementType::Rural => {
            let names = string_column(df, "NOMGEO", "")?;
            df.replace_or_add("NOM_LOC".into(), Series::new("NOM_LOC".into(), names))?;
            df.replace_or_add(
                "CVE_AGEB".into(),
                Series::new("CVE_AGEB".into(), vec!["RURAL"; height]),
            )?;
            df.replace_or_add(
                "CVE_MZA".into(),
                Series::new("CVE_MZA".into(), vec![PLACEHOLDER_BLOCK; height]),
            )?;
        }
    }
    Ok(())
}

/// Copy a string column with a fallback for missing columns or null cells.
fn string_column(df: &DataFrame, name: &str, fallback: &str) -> Result<Vec<String>> {
    match df.column(name) {
        Ok(col) => Ok(col.str()?
            .into_iter()
            .map(|opt| opt.unwrap_or(fallback).to_string())
            .collect()),
        Err(_) => Ok(vec![fallback.to_string(); df.height()]),
    }
}
