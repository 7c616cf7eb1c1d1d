pub mod python;
pub mod types;

use anyhow::Result;

pub use types::{ModelIn, ModelOut, ProfileIn, ProfileOut, VoxelizeIn, VoxelizeOut};

/// Boundary to the external canopy-analysis library. Ground-plane and
/// profile fitting, voxel accumulation, the linear model, and raw-scan
/// decoding all live behind this trait.
pub trait Engine {
    fn fit_profile(&self, req: &ProfileIn) -> Result<ProfileOut>;
    fn voxelize(&self, req: &VoxelizeIn) -> Result<VoxelizeOut>;
    fn run_linear_model(&self, req: &ModelIn) -> Result<ModelOut>;
}
