mod geojson;

pub(crate) use geojson::write_geojson_layer;
