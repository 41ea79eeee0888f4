use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

use super::Geometries;

/// Source coordinate reference detected from a shapefile's `.prj` sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceCrs {
    /// Geographic lon/lat degrees (ITRF92/WGS84 family, treated as equivalent).
    Geographic,
    /// INEGI national Lambert Conformal Conic grid, meters.
    MexicoLcc,
}

/// PROJ.4 string for the INEGI national Lambert Conformal Conic grid.
const MEXICO_LCC_PROJ4: &str =
    "+proj=lcc +lat_1=17.5 +lat_2=29.5 +lat_0=12 +lon_0=-102 +x_0=2500000 +y_0=0 +ellps=GRS80 +units=m +no_defs +type=crs";

const WGS84_PROJ4: &str = "+proj=longlat +datum=WGS84 +no_defs +type=crs";

/// Detect the CRS of a shapefile from its `.prj` sidecar.
/// A missing or unrecognized sidecar is treated as geographic lon/lat.
pub(crate) fn crs_from_shapefile(shp_path: &Path) -> SourceCrs {
    let prj_path = shp_path.with_extension("prj");
    match fs::read_to_string(&prj_path) {
        Ok(wkt) if wkt.contains("Lambert_Conformal_Conic") || wkt.contains("+proj=lcc") => {
            SourceCrs::MexicoLcc
        }
        _ => SourceCrs::Geographic,
    }
}

impl Geometries {
    /// Reproject shapes to WGS84 lon/lat degrees for GeoJSON output.
    /// Geographic sources pass through unchanged (the ITRF92/WGS84 offset is
    /// sub-meter, below the resolution of a census choropleth).
    pub(crate) fn to_wgs84(&self) -> Result<Vec<MultiPolygon<f64>>> {
        match self.crs() {
            SourceCrs::Geographic => Ok(self.shapes().to_vec()),
            SourceCrs::MexicoLcc => {
                let from = Proj4::from_proj_string(MEXICO_LCC_PROJ4)
                    .with_context(|| anyhow!("failed to build source PROJ.4: {MEXICO_LCC_PROJ4}"))?;
                let to = Proj4::from_proj_string(WGS84_PROJ4)
                    .with_context(|| anyhow!("failed to build target PROJ.4: {WGS84_PROJ4}"))?;

                // Map coords: meters in, radians out for a lon/lat target.
                let projected = self.shapes().iter()
                    .map(|shape| shape.map_coords(|coord: Coord<f64>| {
                        let mut point = (coord.x, coord.y, 0.0);
                        transform(&from, &to, &mut point)
                            .expect("CRS transform failed");
                        Coord { x: point.0.to_degrees(), y: point.1.to_degrees() }
                    }))
                    .collect();

                Ok(projected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{LineString, Polygon};

    #[test]
    fn missing_sidecar_defaults_to_geographic() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("layer.shp");
        assert_eq!(crs_from_shapefile(&shp), SourceCrs::Geographic);
    }

    #[test]
    fn lambert_sidecar_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("layer.shp");
        fs::write(
            dir.path().join("layer.prj"),
            "PROJCS[\"MEXICO_ITRF_2008_LCC\",PROJECTION[\"Lambert_Conformal_Conic\"]]",
        )
        .unwrap();
        assert_eq!(crs_from_shapefile(&shp), SourceCrs::MexicoLcc);
    }

    #[test]
    fn geographic_shapes_pass_through_unchanged() {
        let square = MultiPolygon(vec![Polygon::new(
            LineString::from(vec![
                (-95.0, 18.0),
                (-95.0, 18.1),
                (-94.9, 18.1),
                (-94.9, 18.0),
                (-95.0, 18.0),
            ]),
            vec![],
        )]);
        let geoms = Geometries::new(vec![square.clone()], SourceCrs::Geographic);
        assert_eq!(geoms.to_wgs84().unwrap(), vec![square]);
    }
}
