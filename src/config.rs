use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub engine: EngineCfg,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub voxel: Voxel,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: Default::default(),
            engine: Default::default(),
            profile: Default::default(),
            voxel: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineCfg {
    pub python_exe: String,
    pub scripts_dir: String,
    /// Per-position processing timeout. 0 disables the timeout.
    pub timeout_seconds: u64,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            python_exe: "python3".into(),
            scripts_dir: "scripts".into(),
            timeout_seconds: 0,
            env: Default::default(),
        }
    }
}

/// Defaults for the `profiles` command. Explicit CLI flags win.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub out_dir: String,
    pub hres: f64,
    pub zres: f64,
    pub ares: f64,
    pub min_zenith: f64,
    pub max_zenith: f64,
    pub min_height: f64,
    pub max_height: f64,
    pub reflectance_threshold: f64,
    pub method: String,
    pub ground_grid_extent: f64,
    pub ground_grid_resolution: f64,
}
impl Default for Profile {
    fn default() -> Self {
        Self {
            out_dir: "pavd_output".into(),
            hres: 0.5,
            zres: 5.0,
            ares: 90.0,
            min_zenith: 35.0,
            max_zenith: 70.0,
            min_height: 0.0,
            max_height: 50.0,
            reflectance_threshold: -20.0,
            method: "WEIGHTED".into(),
            ground_grid_extent: 60.0,
            ground_grid_resolution: 10.0,
        }
    }
}

/// Defaults for the `voxelize` command. Explicit CLI flags win.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Voxel {
    pub out_dir: String,
    pub voxelsize: f64,
    pub buffer: f64,
    pub hmax: f64,
    pub min_n: u32,
    pub nodata: i64,
}
impl Default for Voxel {
    fn default() -> Self {
        Self {
            out_dir: "voxel_output".into(),
            voxelsize: 1.0,
            buffer: 5.0,
            hmax: 50.0,
            min_n: 3,
            nodata: -9999,
        }
    }
}
