use anyhow::{bail, Result};
use shapefile as shp;

/// Convert a polygonal `Shape` variant to a `geo::MultiPolygon<f64>`.
/// Census and electoral layers only carry plain polygons; anything else is
/// a malformed input file.
pub(crate) fn shape_to_multipolygon(shape: shp::Shape) -> Result<geo::MultiPolygon<f64>> {
    match shape {
        shp::Shape::Polygon(p) => Ok(shp_to_geo(&p)),
        _ => bail!("[common::polygon] unsupported non-polygon shape in layer"),
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>
pub(crate) fn shp_to_geo(p: &shp::Polygon) -> geo::MultiPolygon<f64> {
    /// Ensure first and last are the same for geo::LineString coords
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if !coords.is_empty() {
            if coords[0] != coords[coords.len() - 1] {
                coords.push(coords[0])
            }
        }
    }

    /// Get the signed area of a geo::Coord list (negative for hole)
    fn signed_area(pts: &[geo::Coord<f64>]) -> f64 {
        let mut a = 0.0;
        for w in pts.windows(2) {
            a += w[0].x * w[1].y - w[1].x * w[0].y;
        }
        a / 2.0
    }

    // 1) Convert each ring into a LineString (ensure closed)
    let mut ls_rings: Vec<(geo::LineString<f64>, bool /*is_exterior*/)> = Vec::with_capacity(p.rings().len());
    for ring in p.rings().iter() {
        let mut coords: Vec<geo::Coord<f64>> = ring.points().iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect();
        ensure_closed(&mut coords);
        let ls = geo::LineString(coords);
        // Shapefile stores exteriors CW, holes CCW; infer by orientation.
        let is_exterior = signed_area(&ls.0) < 0.0;
        ls_rings.push((ls, is_exterior));
    }

    // 2) Group: each exterior with its following holes (Shapefile stores rings in this order)
    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<geo::LineString<f64>> = None;
    let mut current_holes: Vec<geo::LineString<f64>> = Vec::new();

    for (ls, is_exterior) in ls_rings {
        if is_exterior {
            // flush previous polygon
            if let Some(ext) = current_exterior.take() {
                polys.push(geo::Polygon::new(ext, current_holes));
                current_holes = Vec::new();
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(geo::Polygon::new(ext, current_holes));
    }

    geo::MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::{Point, PolygonRing};

    #[test]
    fn converts_single_ring_polygon() {
        // CW ring, the shapefile exterior convention
        let ring = PolygonRing::Outer(vec![
            Point { x: 0.0, y: 0.0 },
            Point { x: 0.0, y: 1.0 },
            Point { x: 1.0, y: 1.0 },
            Point { x: 1.0, y: 0.0 },
            Point { x: 0.0, y: 0.0 },
        ]);
        let mp = shp_to_geo(&shp::Polygon::with_rings(vec![ring]));

        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].exterior().0.len(), 5);
        assert!(mp.0[0].interiors().is_empty());
    }

    #[test]
    fn rejects_non_polygon_shapes() {
        let shape = shp::Shape::Point(Point { x: 0.0, y: 0.0 });
        assert!(shape_to_multipolygon(shape).is_err());
    }
}
