use geo::{BoundingRect, Coord, MultiPolygon, Rect};
use rstar::{RTree, AABB};

use super::bbox::BoundingBox;
use super::crs::SourceCrs;

/// A collection of MultiPolygons with a spatial index and a known source CRS.
#[derive(Debug, Clone)]
pub(crate) struct Geometries {
    shapes: Vec<MultiPolygon<f64>>,
    rtree: RTree<BoundingBox>,
    crs: SourceCrs,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    pub(crate) fn new(polygons: Vec<MultiPolygon<f64>>, crs: SourceCrs) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons.iter().enumerate()
                    .filter_map(|(i, polygon)| polygon.bounding_rect().map(|r| BoundingBox::new(i, r)))
                    .collect()
            ),
            shapes: polygons,
            crs,
        }
    }

    /// Get the number of MultiPolygons.
    #[inline] pub(crate) fn len(&self) -> usize { self.shapes.len() }

    /// Check if there are no MultiPolygons.
    #[inline] pub(crate) fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Get a reference to the list of MultiPolygons.
    #[inline] pub(crate) fn shapes(&self) -> &[MultiPolygon<f64>] { &self.shapes }

    /// Get the source CRS the shapes were read in.
    #[inline] pub(crate) fn crs(&self) -> SourceCrs { self.crs }

    /// Indices of shapes whose bounding boxes intersect the given envelope,
    /// in ascending order.
    pub(crate) fn query_indices(&self, envelope: &AABB<[f64; 2]>) -> Vec<usize> {
        let mut indices: Vec<usize> = self.rtree
            .locate_in_envelope_intersecting(envelope)
            .map(|b| b.idx())
            .collect();
        indices.sort_unstable();
        indices
    }

    /// Compute the bounding rectangle of all MultiPolygons.
    #[inline]
    pub(crate) fn bounds(&self) -> Option<Rect<f64>> {
        self.shapes.iter()
            .filter_map(|polygon| polygon.bounding_rect())
            .reduce(|a, b| Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                }
            ))
    }
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

    #[test]
    fn query_returns_only_intersecting_indices() {
        let geoms = Geometries::new(
            vec![square(0.0, 0.0), square(5.0, 5.0), square(100.0, 100.0)],
            SourceCrs::Geographic,
        );
        let envelope = AABB::from_corners([0.0, 0.0], [6.0, 6.0]);
        assert_eq!(geoms.query_indices(&envelope), vec![0, 1]);
    }

    #[test]
    fn bounds_cover_all_shapes() {
        let geoms = Geometries::new(vec![square(0.0, 0.0), square(9.0, 3.0)], SourceCrs::Geographic);
        let bounds = geoms.bounds().unwrap();
        assert_eq!(bounds.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(bounds.max(), Coord { x: 10.0, y: 4.0 });
    }

    #[test]
    fn empty_collection_has_no_bounds() {
        let geoms = Geometries::new(vec![], SourceCrs::Geographic);
        assert!(geoms.is_empty());
        assert!(geoms.bounds().is_none());
    }
}
