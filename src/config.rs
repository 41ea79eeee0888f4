use std::path::PathBuf;

/// Run configuration: one municipality extracted from the statewide datasets.
///
/// Input and output file names are fixed by convention; only the municipality
/// selector and the directory roots vary between runs.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Three-digit municipality code within the state, e.g. "032".
    pub municipality: String,
    pub data_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl PipelineConfig {
    pub fn new(
        municipality: impl Into<String>,
        data_dir: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            municipality: municipality.into(),
            data_dir: data_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    pub fn urban_shapes(&self) -> PathBuf { self.data_dir.join("mapas").join("30m.shp") }
    pub fn rural_shapes(&self) -> PathBuf { self.data_dir.join("mapas").join("30l.shp") }
    pub fn section_shapes(&self) -> PathBuf { self.data_dir.join("mapas").join("SECCION.shp") }

    pub fn urban_table(&self) -> PathBuf {
        self.data_dir.join("tablas").join("conjunto_de_datos_ageb_urbana_30_cpv2020.csv")
    }
    pub fn rural_table(&self) -> PathBuf { self.data_dir.join("tablas").join("iter_veracruz_2020.csv") }
    pub fn votes_table(&self) -> PathBuf { self.data_dir.join("tablas").join("Municipal_2025.csv") }

    pub fn urban_output(&self) -> PathBuf { self.out_dir.join("sits_capa_urbana.geojson") }
    pub fn rural_output(&self) -> PathBuf { self.out_dir.join("sits_capa_rural.geojson") }
    pub fn electoral_output(&self) -> PathBuf { self.out_dir.join("sits_capa_politica.geojson") }
    pub fn manifest_output(&self) -> PathBuf { self.out_dir.join("manifest.json") }
}
