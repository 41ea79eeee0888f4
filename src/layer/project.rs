//! Population base-year columns and the fixed-factor projection.

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use polars::prelude::*;

/// Static five-percent uplift applied to every demographic subgroup.
pub(crate) const GROWTH_FACTOR: f64 = 1.05;

/// Base-year output column paired with its canonical census source column.
const SUBGROUPS: &[(&str, &str)] = &[
    ("P20_TOT", "POBTOT"),
    ("P20_FEM", "POBFEM"),
    ("P20_MAS", "POBMAS"),
    ("P20_IND", "P3YM_HLI"),
    ("P20_AFRO", "POB_AFRO"),
    ("P20_DISC", "PCON_DISC"),
    ("P20_JEFAS", "HOGJEF_F"),
    ("P20_NINOS", "POB0_14"),
    ("P20_MAYORES", "P_60YMAS"),
];

/// Copy base-year subgroup counts into `P20_*` columns and project each to
/// `P25_*` by the fixed growth factor. Linear and stateless: no trend
/// fitting, no subgroup-specific rates.
pub(crate) fn add_population_columns(df: &mut DataFrame) -> Result<()> {
    for (target, source) in SUBGROUPS {
        let base: Vec<f64> = df.column(source)
            .with_context(|| format!("[layer::project] missing normalized column: {source}"))?
            .f64()?
            .into_no_null_iter()
            .collect();
        let projected: Vec<f64> = base.iter().map(|v| v * GROWTH_FACTOR).collect();

        let projected_name = target.replace("P20_", "P25_");
        df.replace_or_add((*target).into(), Series::new((*target).into(), base))?;
        df.replace_or_add(
            projected_name.as_str().into(),
            Series::new(projected_name.as_str().into(), projected),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn value(df: &DataFrame, name: &str) -> f64 {
        df.column(name).unwrap().f64().unwrap().get(0).unwrap()
    }

    #[test]
    fn projects_every_subgroup_by_five_percent() {
        let mut df = DataFrame::new(vec![
            Column::new("POBTOT".into(), vec!["100"]),
            Column::new("POBFEM".into(), vec!["60"]),
        ])
        .unwrap();
        schema::normalize_census(&mut df).unwrap();
        add_population_columns(&mut df).unwrap();

        assert_eq!(value(&df, "P20_TOT"), 100.0);
        assert_eq!(value(&df, "P25_TOT"), 105.0);
        assert_eq!(value(&df, "P20_FEM"), 60.0);
        assert_eq!(value(&df, "P25_FEM"), 63.0);

        // Absent subgroups stay zero in both years.
        assert_eq!(value(&df, "P20_AFRO"), 0.0);
        assert_eq!(value(&df, "P25_AFRO"), 0.0);

        for (target, _) in SUBGROUPS {
            assert!(df.column(target).is_ok());
            assert!(df.column(target.replace("P20_", "P25_").as_str()).is_ok());
        }
    }

    #[test]
    fn zero_population_projects_to_zero() {
        let mut df = DataFrame::new(vec![Column::new("POBTOT".into(), vec!["0"])]).unwrap();
        schema::normalize_census(&mut df).unwrap();
        add_population_columns(&mut df).unwrap();
        assert_eq!(value(&df, "P25_TOT"), 0.0);
    }
}
