//! Electoral section overlay: bounding-box trim, tally aggregation and
//! plurality-winner labeling.

use std::path::Path;

use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use geo::{MultiPolygon, Rect};
use polars::frame::DataFrame;
use polars::prelude::*;
use rstar::AABB;

use crate::common;
use crate::geom::{crs_from_shapefile, Geometries, SourceCrs};

/// Tracked parties, in canonical order. Ties on the maximum tally resolve
/// to the earliest entry.
pub(crate) const PARTIES: [&str; 4] = ["morena", "pan", "pri", "mc"];

/// One processed electoral layer: vote tallies and winners aligned
/// index-for-index with section geometries.
pub(crate) struct ElectoralLayer {
    pub(crate) data: DataFrame,
    pub(crate) geoms: Geometries,
}

impl ElectoralLayer {
    pub(crate) fn len(&self) -> usize {
        self.geoms.len()
    }
}

/// Build the electoral overlay: trim sections to the urban extent, join the
/// aggregated tallies by section code, and label each section with its
/// plurality winner.
pub(crate) fn build_electoral_layer(
    shp_path: &Path,
    votes_path: &Path,
    urban_bounds: Option<Rect<f64>>,
) -> Result<ElectoralLayer> {
    let items = common::read_shapefile(shp_path)?;
    let votes = common::read_table(votes_path)?;
    let crs = crs_from_shapefile(shp_path);

    let mut shapes = Vec::with_capacity(items.len());
    let mut codes = Vec::with_capacity(items.len());
    for (shape, record) in items {
        shapes.push(common::shape_to_multipolygon(shape)?);
        codes.push(common::integer_field(&record, "SECCION")?);
    }

    join_sections(shapes, codes, votes, urban_bounds, crs)
}

/// Join pre-parsed section geometries with a vote table. Split from
/// [`build_electoral_layer`] so the overlay semantics can be exercised
/// without shapefile fixtures.
fn join_sections(
    shapes: Vec<MultiPolygon<f64>>,
    codes: Vec<i64>,
    votes: DataFrame,
    urban_bounds: Option<Rect<f64>>,
    crs: SourceCrs,
) -> Result<ElectoralLayer> {
    let all = Geometries::new(shapes, crs);

    // Spatial pre-filter: keep sections whose bbox touches the urban extent.
    // A coarse cut bounding the join to the municipality's approximate area,
    // not an administrative match.
    let indices: Vec<usize> = match urban_bounds {
        Some(rect) => {
            let envelope = AABB::from_corners(rect.min().into(), rect.max().into());
            all.query_indices(&envelope)
        }
        None => (0..all.len()).collect(),
    };
    if indices.is_empty() {
        bail!("[layer::electoral] no sections intersect the urban extent");
    }

    let tallies = aggregate_votes(&votes)?;

    let mut kept_shapes = Vec::new();
    let mut kept_codes = Vec::new();
    let mut kept_tallies: Vec<[i64; 4]> = Vec::new();
    for idx in indices {
        let code = codes[idx];
        if let Some(tally) = tallies.get(&code) {
            kept_shapes.push(all.shapes()[idx].clone());
            kept_codes.push(code);
            kept_tallies.push(*tally);
        }
    }

    let winners: Vec<&str> = kept_tallies.iter().map(plurality_winner).collect();

    let mut columns = vec![Column::new("SECCION".into(), kept_codes)];
    for (p, party) in PARTIES.iter().enumerate() {
        let values: Vec<i64> = kept_tallies.iter().map(|t| t[p]).collect();
        columns.push(Column::new((*party).into(), values));
    }
    columns.push(Column::new("GANADOR".into(), winners));

    Ok(ElectoralLayer {
        data: DataFrame::new(columns)?,
        geoms: Geometries::new(kept_shapes, crs),
    })
}

/// Sum tallies per section code for the tracked party set. Duplicate rows
/// for one section accumulate.
fn aggregate_votes(votes: &DataFrame) -> Result<AHashMap<i64, [i64; 4]>> {
    let sections = integer_column(votes, "seccion")?;
    let mut party_columns = Vec::with_capacity(PARTIES.len());
    for party in PARTIES {
        party_columns.push(integer_column(votes, party)?);
    }

    let mut tallies: AHashMap<i64, [i64; 4]> = AHashMap::with_capacity(sections.len());
    for (i, code) in sections.iter().enumerate() {
        let entry = tallies.entry(*code).or_insert([0; 4]);
        for (p, column) in party_columns.iter().enumerate() {
            entry[p] += column[i];
        }
    }
    Ok(tallies)
}

/// Coerce a column of section codes or tallies to i64, accepting string or
/// numeric storage. An unparseable cell fails the layer rather than
/// silently skewing a tally.
fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let col = df.column(name)
        .with_context(|| format!("[layer::electoral] vote table is missing the {name} column"))?;
    let series = col.as_materialized_series();
    if let Ok(ca) = series.str() {
        ca.into_iter()
            .map(|opt| {
                let s = opt.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("0");
                s.parse::<i64>()
                    .or_else(|_| s.parse::<f64>().map(|v| v as i64))
                    .with_context(|| format!("[layer::electoral] {name} value is not numeric: {s:?}"))
            })
            .collect()
    } else {
        let cast = series.cast(&DataType::Int64)?;
        Ok(cast.i64()?.into_iter().map(|opt| opt.unwrap_or(0)).collect())
    }
}

/// Party with the strictly largest tally; earlier canonical order wins ties.
fn plurality_winner(tally: &[i64; 4]) -> &'static str {
    let mut best = 0;
    for i in 1..PARTIES.len() {
        if tally[i] > tally[best] {
            best = i;
        }
    }
    PARTIES[best]
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, LineString, Polygon};

    fn square(x: f64, y: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![Polygon::new(
            LineString::from(vec![(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)]),
            vec![],
        )])
    }

    fn votes(columns: Vec<(&str, Vec<&str>)>) -> DataFrame {
        DataFrame::new(
            columns.into_iter()
                .map(|(name, values)| Column::new(name.into(), values))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn plurality_winner_picks_the_maximum() {
        assert_eq!(plurality_winner(&[120, 80, 95, 10]), "morena");
        assert_eq!(plurality_winner(&[10, 80, 95, 110]), "mc");
    }

    #[test]
    fn ties_resolve_to_canonical_order() {
        assert_eq!(plurality_winner(&[50, 50, 0, 0]), "morena");
        assert_eq!(plurality_winner(&[10, 50, 50, 10]), "pan");
    }

    #[test]
    fn duplicate_section_rows_are_summed() {
        let df = votes(vec![
            ("seccion", vec!["1", "1", "2"]),
            ("morena", vec!["10", "5", "7"]),
            ("pan", vec!["1", "2", "3"]),
            ("pri", vec!["0", "0", "0"]),
            ("mc", vec!["0", "0", "0"]),
        ]);
        let tallies = aggregate_votes(&df).unwrap();
        assert_eq!(tallies[&1], [15, 3, 0, 0]);
        assert_eq!(tallies[&2], [7, 3, 0, 0]);
    }

    #[test]
    fn padded_section_codes_join_as_integers() {
        let df = votes(vec![
            ("seccion", vec!["0123"]),
            ("morena", vec!["40"]),
            ("pan", vec!["60"]),
            ("pri", vec!["0"]),
            ("mc", vec!["0"]),
        ]);
        let layer = join_sections(
            vec![square(0.0, 0.0)],
            vec![123],
            df,
            None,
            SourceCrs::Geographic,
        )
        .unwrap();

        assert_eq!(layer.len(), 1);
        assert_eq!(layer.data.column("SECCION").unwrap().i64().unwrap().get(0), Some(123));
        assert_eq!(layer.data.column("GANADOR").unwrap().str().unwrap().get(0), Some("pan"));
    }

    #[test]
    fn sections_outside_the_urban_extent_are_trimmed() {
        let df = votes(vec![
            ("seccion", vec!["1", "2"]),
            ("morena", vec!["10", "20"]),
            ("pan", vec!["0", "0"]),
            ("pri", vec!["0", "0"]),
            ("mc", vec!["0", "0"]),
        ]);
        let bounds = Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: 10.0, y: 10.0 });
        let layer = join_sections(
            vec![square(0.0, 0.0), square(100.0, 100.0)],
            vec![1, 2],
            df,
            Some(bounds),
            SourceCrs::Geographic,
        )
        .unwrap();

        assert_eq!(layer.len(), 1);
        assert_eq!(layer.data.column("SECCION").unwrap().i64().unwrap().get(0), Some(1));
    }

    #[test]
    fn empty_intersection_is_an_error() {
        let df = votes(vec![
            ("seccion", vec!["1"]),
            ("morena", vec!["10"]),
            ("pan", vec!["0"]),
            ("pri", vec!["0"]),
            ("mc", vec!["0"]),
        ]);
        let bounds = Rect::new(Coord { x: 50.0, y: 50.0 }, Coord { x: 60.0, y: 60.0 });
        let result = join_sections(
            vec![square(0.0, 0.0)],
            vec![1],
            df,
            Some(bounds),
            SourceCrs::Geographic,
        );
        assert!(result.is_err());
    }

    #[test]
    fn sections_without_tallies_are_dropped() {
        let df = votes(vec![
            ("seccion", vec!["1"]),
            ("morena", vec!["10"]),
            ("pan", vec!["0"]),
            ("pri", vec!["0"]),
            ("mc", vec!["0"]),
        ]);
        let layer = join_sections(
            vec![square(0.0, 0.0), square(2.0, 0.0)],
            vec![1, 2],
            df,
            None,
            SourceCrs::Geographic,
        )
        .unwrap();
        assert_eq!(layer.len(), 1);
    }
}
