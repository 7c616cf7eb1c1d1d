use serde::{Deserialize, Serialize};

/// One position's vertical plant-profile request: ground-plane fit over
/// a min-Z grid centered on the sensor, then the Jupp (2009) profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileIn {
    pub rxp_file: String,
    pub rdbx_file: Option<String>,
    pub transform_file: String,
    pub grid_extent: f64,
    pub grid_resolution: f64,
    pub grid_origin: [f64; 2],
    pub hres: f64,
    pub zres: f64,
    pub ares: f64,
    pub min_zenith: f64,
    pub max_zenith: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub reflectance_threshold: f64,
    pub method: String,
}

/// Profile arrays are indexed by vertical bin; every array has one
/// value per entry of `height_bin`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileOut {
    pub ok: bool,
    pub error: Option<String>,
    pub ground_plane: Vec<f64>,
    pub height_bin: Vec<f64>,
    pub hinge_pai: Vec<f64>,
    pub linear_pai: Vec<f64>,
    pub weighted_pai: Vec<f64>,
    pub hinge_pavd: Vec<f64>,
    pub linear_pavd: Vec<f64>,
    pub weighted_pavd: Vec<f64>,
    pub linear_mla: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelizeIn {
    pub rxp_file: String,
    pub rdbx_file: Option<String>,
    pub transform_file: String,
    pub bounds: [f64; 6],
    pub voxelsize: f64,
    pub dtm: Option<String>,
    pub save_counts: bool,
    /// Grid files are written as `<out_prefix>_<grid>.tif` by the
    /// engine; the response lists their names.
    pub out_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelizeOut {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub filenames: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIn {
    pub config_file: String,
    pub min_n: u32,
    pub weights: bool,
    pub out_dir: String,
}

/// The engine persists the four model arrays (vertical PAI, horizontal
/// PAI, observation counts, cover profile) under `out_dir` and reports
/// what it wrote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOut {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub paiv_shape: Vec<u64>,
    #[serde(default)]
    pub paih_shape: Vec<u64>,
    #[serde(default)]
    pub cover_shape: Vec<u64>,
}
