use anyhow::{Context, Result};
use std::path::Path;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

/// File stem of the project directory, used to name the voxelization
/// config artifact (`<stem>_config.json`).
pub fn project_stem(project: &Path) -> String {
    project
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
