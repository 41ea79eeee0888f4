mod electoral;
mod join;
mod project;

pub(crate) use electoral::{build_electoral_layer, ElectoralLayer};
pub(crate) use join::build_layer;

use polars::frame::DataFrame;

use crate::geom::Geometries;

/// Settlement type of a census layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementType {
    Urban,
    Rural,
}

impl SettlementType {
    /// Label stored in the output `TIPO` column.
    pub fn label(&self) -> &'static str {
        match self {
            SettlementType::Urban => "Urbano",
            SettlementType::Rural => "Rural",
        }
    }
}

/// One processed census layer: attribute rows aligned index-for-index with
/// their MultiPolygon geometries.
pub struct GeoLayer {
    pub kind: SettlementType,
    /// Display name detected from the first matching census row.
    pub municipality_name: String,
    pub(crate) data: DataFrame,
    pub(crate) geoms: Geometries,
}

impl GeoLayer {
    pub fn len(&self) -> usize {
        self.geoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geoms.is_empty()
    }
}
