//! Deprivation ratios and the composite index over normalized census columns.

use anyhow::{Context, Result};
use polars::frame::DataFrame;
use polars::prelude::*;

/// Names of the six deprivation ratios, in reporting order.
pub(crate) const RATIO_COLUMNS: [&str; 6] = [
    "CAR_EDU_20",
    "CAR_SALUD_20",
    "CAR_VIV_20",
    "CAR_SERV_20",
    "CAR_ALIM_20",
    "CAR_POBREZA_20",
];

/// Composite index column name.
pub(crate) const INDEX_COLUMN: &str = "SITS_INDEX";

/// Substitute non-positive denominators with one so sparse units divide
/// cleanly instead of failing. Only the divisor is substituted; the stored
/// counts keep their true zeros.
#[inline]
fn divisor(x: f64) -> f64 {
    if x > 0.0 { x } else { 1.0 }
}

#[inline]
fn clip01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// Compute the six deprivation ratios and the composite index, appending
/// them to `df`. Every ratio is clipped to [0, 1]; the composite is the
/// unweighted mean of the first five (the monetary-poverty proxy is
/// reported separately, not folded into the index).
pub(crate) fn compute_indicators(df: &mut DataFrame) -> Result<()> {
    let pobtot = numeric(df, "POBTOT")?;
    let p15 = numeric(df, "P_15YMAS")?;
    let tviv = numeric(df, "TVIVPARHAB")?;
    let an = numeric(df, "P15YM_AN")?;
    let se = numeric(df, "P15YM_SE")?;
    let pder_ss = numeric(df, "PDER_SS")?;
    let pisoti = numeric(df, "VPH_PISOTI")?;
    let aguafv = numeric(df, "VPH_AGUAFV")?;
    let nodren = numeric(df, "VPH_NODREN")?;
    let s_elec = numeric(df, "VPH_S_ELEC")?;
    let refri = numeric(df, "VPH_REFRI")?;
    let lavad = numeric(df, "VPH_LAVAD")?;
    let autom = numeric(df, "VPH_AUTOM")?;
    let pc = numeric(df, "VPH_PC")?;

    let height = df.height();
    let mut edu = Vec::with_capacity(height);
    let mut salud = Vec::with_capacity(height);
    let mut viv = Vec::with_capacity(height);
    let mut serv = Vec::with_capacity(height);
    let mut alim = Vec::with_capacity(height);
    let mut pobreza = Vec::with_capacity(height);

    for i in 0..height {
        edu.push(clip01((an[i] + se[i]) / divisor(p15[i])));
        salud.push(clip01(1.0 - pder_ss[i] / divisor(pobtot[i])));
        viv.push(clip01(pisoti[i] / divisor(tviv[i])));
        serv.push(clip01((aguafv[i] + nodren[i] + s_elec[i]) / 3.0 / divisor(tviv[i])));
        alim.push(clip01(1.0 - refri[i] / divisor(tviv[i])));
        pobreza.push(clip01(1.0 - (refri[i] + lavad[i] + autom[i] + pc[i]) / (4.0 * divisor(tviv[i]))));
    }

    let index: Vec<f64> = (0..height)
        .map(|i| (edu[i] + salud[i] + viv[i] + serv[i] + alim[i]) / 5.0)
        .collect();

    let ratios = [edu, salud, viv, serv, alim, pobreza];
    for (name, values) in RATIO_COLUMNS.iter().zip(ratios) {
        df.replace_or_add((*name).into(), Series::new((*name).into(), values))?;
    }
    df.replace_or_add(INDEX_COLUMN.into(), Series::new(INDEX_COLUMN.into(), index))?;

    Ok(())
}

/// Fetch a canonical column as a dense f64 vector.
fn numeric(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    Ok(df.column(name)
        .with_context(|| format!("[indicators] missing normalized column: {name}"))?
        .f64()?
        .into_no_null_iter()
        .collect())
}
