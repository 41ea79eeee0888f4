//! Canonical census schema: legacy-alias renaming and numeric coercion.

use anyhow::Result;
use polars::frame::DataFrame;
use polars::prelude::*;

/// One canonical census field and the legacy spellings it may arrive under.
pub(crate) struct FieldSpec {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Census count fields consumed by the indicator engine and the projector.
pub(crate) const CENSUS_FIELDS: &[FieldSpec] = &[
    FieldSpec { canonical: "POBTOT", aliases: &[] },
    FieldSpec { canonical: "POBFEM", aliases: &["POB_FEM"] },
    FieldSpec { canonical: "POBMAS", aliases: &["POB_MAS"] },
    FieldSpec { canonical: "POB0_14", aliases: &[] },
    FieldSpec { canonical: "POB15_64", aliases: &[] },
    FieldSpec { canonical: "P_60YMAS", aliases: &[] },
    FieldSpec { canonical: "P_65YMAS", aliases: &[] },
    FieldSpec { canonical: "P3YM_HLI", aliases: &[] },
    FieldSpec { canonical: "POB_AFRO", aliases: &[] },
    FieldSpec { canonical: "PCON_DISC", aliases: &[] },
    FieldSpec { canonical: "HOGJEF_F", aliases: &[] },
    FieldSpec { canonical: "TVIVPARHAB", aliases: &[] },
    FieldSpec { canonical: "VPH_PISOTI", aliases: &[] },
    FieldSpec { canonical: "VPH_NODREN", aliases: &[] },
    FieldSpec { canonical: "VPH_S_ELEC", aliases: &[] },
    FieldSpec { canonical: "VPH_AGUAFV", aliases: &[] },
    FieldSpec { canonical: "VPH_REFRI", aliases: &[] },
    FieldSpec { canonical: "VPH_LAVAD", aliases: &["VPH_LAVADORA"] },
    FieldSpec { canonical: "VPH_AUTOM", aliases: &[] },
    FieldSpec { canonical: "VPH_PC", aliases: &[] },
    FieldSpec { canonical: "PDER_SS", aliases: &[] },
    FieldSpec { canonical: "P_15YMAS", aliases: &[] },
    FieldSpec { canonical: "P15YM_AN", aliases: &[] },
    FieldSpec { canonical: "P15YM_SE", aliases: &[] },
];

/// Outcome of normalizing one DataFrame against [`CENSUS_FIELDS`].
///
/// `absent` lists fields that were missing from the source and were
/// zero-filled, so callers can tell "field absent" apart from "field
/// present but zero" when reading the output.
#[derive(Debug, Default)]
pub(crate) struct NormalizeReport {
    pub absent: Vec<&'static str>,
    pub renamed: Vec<(&'static str, &'static str)>,
}

/// Rename legacy aliases to canonical names, then coerce every canonical
/// field to Float64 with unparseable or missing cells as zero. Columns not
/// in the schema are left untouched; a missing field becomes an explicit
/// all-zero column rather than an error.
pub(crate) fn normalize_census(df: &mut DataFrame) -> Result<NormalizeReport> {
    let mut report = NormalizeReport::default();

    for spec in CENSUS_FIELDS {
        if df.column(spec.canonical).is_err() {
            for alias in spec.aliases {
                if df.column(alias).is_ok() {
                    df.rename(alias, spec.canonical.into())?;
                    report.renamed.push((*alias, spec.canonical));
                    break;
                }
            }
        }
    }

    let height = df.height();
    for spec in CENSUS_FIELDS {
        let values = match df.column(spec.canonical) {
            Ok(col) => coerce_numeric(col)?,
            Err(_) => {
                report.absent.push(spec.canonical);
                vec![0.0; height]
            }
        };
        df.replace_or_add(spec.canonical.into(), Series::new(spec.canonical.into(), values))?;
    }

    Ok(report)
}

/// Parse a column to f64, mapping unparseable or null cells to zero.
fn coerce_numeric(col: &Column) -> Result<Vec<f64>> {
    let series = col.as_materialized_series();
    if let Ok(ca) = series.str() {
        Ok(ca.into_iter()
            .map(|opt| opt.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0))
            .collect())
    } else {
        let cast = series.cast(&DataType::Float64)?;
        Ok(cast.f64()?.into_iter().map(|opt| opt.unwrap_or(0.0)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(columns: Vec<Column>) -> DataFrame {
        DataFrame::new(columns).unwrap()
    }

    fn values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name).unwrap().f64().unwrap().into_no_null_iter().collect()
    }

    #[test]
    fn renames_legacy_aliases() {
        let mut df = frame(vec![
            Column::new("POB_FEM".into(), vec!["10", "20"]),
            Column::new("VPH_LAVADORA".into(), vec!["1", "2"]),
        ]);
        let report = normalize_census(&mut df).unwrap();

        assert!(df.column("POB_FEM").is_err());
        assert!(df.column("VPH_LAVADORA").is_err());
        assert_eq!(values(&df, "POBFEM"), vec![10.0, 20.0]);
        assert_eq!(values(&df, "VPH_LAVAD"), vec![1.0, 2.0]);
        assert!(report.renamed.contains(&("POB_FEM", "POBFEM")));
    }

    #[test]
    fn alias_is_skipped_when_canonical_already_present() {
        let mut df = frame(vec![
            Column::new("POBFEM".into(), vec!["5"]),
            Column::new("POB_FEM".into(), vec!["7"]),
        ]);
        normalize_census(&mut df).unwrap();

        assert_eq!(values(&df, "POBFEM"), vec![5.0]);
        assert!(df.column("POB_FEM").is_ok());
    }

    #[test]
    fn unparseable_cells_become_zero() {
        let mut df = frame(vec![Column::new("POBTOT".into(), vec!["12", "n/a", "*"])]);
        normalize_census(&mut df).unwrap();
        assert_eq!(values(&df, "POBTOT"), vec![12.0, 0.0, 0.0]);
    }

    #[test]
    fn absent_fields_are_zero_filled_and_reported() {
        let mut df = frame(vec![Column::new("POBTOT".into(), vec!["1", "2"])]);
        let report = normalize_census(&mut df).unwrap();

        assert!(report.absent.contains(&"VPH_REFRI"));
        assert!(!report.absent.contains(&"POBTOT"));
        assert_eq!(values(&df, "VPH_REFRI"), vec![0.0, 0.0]);
    }

    #[test]
    fn unlisted_columns_are_untouched() {
        let mut df = frame(vec![
            Column::new("POBTOT".into(), vec!["1"]),
            Column::new("NOM_MUN".into(), vec!["Catemaco"]),
        ]);
        normalize_census(&mut df).unwrap();
        assert_eq!(df.column("NOM_MUN").unwrap().str().unwrap().get(0), Some("Catemaco"));
    }
}
