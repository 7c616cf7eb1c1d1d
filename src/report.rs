use crate::batch::Outcome;
use crate::bounds::Bounds;
use crate::engine::{ProfileOut, VoxelizeOut};
use crate::util::ensure_dir;
use anyhow::{Context, Result, bail};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const SUMMARY_FILENAME: &str = "pavd_summary.csv";

/// Success payload of one profile-mode position: the sensor origin from
/// the transform plus the engine's fitted profile.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub sensor_origin: Point3<f64>,
    pub profile: ProfileOut,
}

/// Write the profile-mode artifacts: `pavd_summary.csv` with one row
/// per successful position, and one `<pos>_<scan>_profiles.csv` per
/// success with one row per vertical bin. With zero successes nothing
/// is written and 0 is returned. Re-running with the same outcomes
/// overwrites the same bytes; no artifact carries a timestamp.
pub fn write_profile_reports(
    outcomes: &[Outcome<ProfileRecord>],
    out_dir: &Path,
    hres: f64,
) -> Result<usize> {
    let successes: Vec<(&str, &str, &ProfileRecord)> = outcomes
        .iter()
        .filter_map(|o| match o {
            Outcome::Success {
                position,
                scan_name,
                payload,
            } => Some((position.as_str(), scan_name.as_str(), payload)),
            Outcome::Failure { .. } => None,
        })
        .collect();

    if successes.is_empty() {
        return Ok(0);
    }

    ensure_dir(out_dir)?;
    for (position, _, record) in &successes {
        validate_profile(position, &record.profile)?;
    }

    write_summary(&successes, &out_dir.join(SUMMARY_FILENAME), hres)?;
    for (position, scan_name, record) in &successes {
        let path = out_dir.join(format!("{position}_{scan_name}_profiles.csv"));
        write_profile_detail(record, &path)?;
    }

    Ok(successes.len())
}

fn validate_profile(position: &str, profile: &ProfileOut) -> Result<()> {
    if profile.ground_plane.len() < 3 {
        bail!(
            "profile for {position} has {} ground-plane parameters, expected 3",
            profile.ground_plane.len()
        );
    }
    let bins = profile.height_bin.len();
    for (name, arr) in [
        ("hinge_pai", &profile.hinge_pai),
        ("linear_pai", &profile.linear_pai),
        ("weighted_pai", &profile.weighted_pai),
        ("hinge_pavd", &profile.hinge_pavd),
        ("linear_pavd", &profile.linear_pavd),
        ("weighted_pavd", &profile.weighted_pavd),
        ("linear_mla", &profile.linear_mla),
    ] {
        if arr.len() != bins {
            bail!(
                "profile array {name} for {position} has {} bins, expected {bins}",
                arr.len()
            );
        }
    }
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file =
        File::create(path).with_context(|| format!("create file: {}", path.display()))?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

fn fmt(v: f64) -> String {
    format!("{v:.6}")
}

/// Per-method PAI total for the summary: bin sum scaled by the bin
/// height.
fn total_pai(pai: &[f64], hres: f64) -> f64 {
    pai.iter().sum::<f64>() * hres
}

fn write_summary(successes: &[(&str, &str, &ProfileRecord)], path: &Path, hres: f64) -> Result<()> {
    let mut w = csv_writer(path)?;
    w.write_record([
        "scan_pos",
        "scan_name",
        "sensor_x",
        "sensor_y",
        "sensor_z",
        "ground_intercept",
        "ground_slope_x",
        "ground_slope_y",
        "total_pai_hinge",
        "total_pai_linear",
        "total_pai_weighted",
    ])
    .with_context(|| format!("writing {}", path.display()))?;

    for (position, scan_name, record) in successes {
        let p = &record.profile;
        let o = record.sensor_origin;
        w.write_record(&[
            position.to_string(),
            scan_name.to_string(),
            fmt(o.x),
            fmt(o.y),
            fmt(o.z),
            fmt(p.ground_plane[0]),
            fmt(p.ground_plane[1]),
            fmt(p.ground_plane[2]),
            fmt(total_pai(&p.hinge_pai, hres)),
            fmt(total_pai(&p.linear_pai, hres)),
            fmt(total_pai(&p.weighted_pai, hres)),
        ])
        .with_context(|| format!("writing {}", path.display()))?;
    }

    w.flush()
        .with_context(|| format!("flushing {}", path.display()))
}

fn write_profile_detail(record: &ProfileRecord, path: &Path) -> Result<()> {
    let p = &record.profile;
    let mut w = csv_writer(path)?;
    w.write_record([
        "height",
        "hinge_pai",
        "linear_pai",
        "weighted_pai",
        "hinge_pavd",
        "linear_pavd",
        "weighted_pavd",
        "linear_mla",
    ])
    .with_context(|| format!("writing {}", path.display()))?;

    for i in 0..p.height_bin.len() {
        w.write_record(&[
            fmt(p.height_bin[i]),
            fmt(p.hinge_pai[i]),
            fmt(p.linear_pai[i]),
            fmt(p.weighted_pai[i]),
            fmt(p.hinge_pavd[i]),
            fmt(p.linear_pavd[i]),
            fmt(p.weighted_pavd[i]),
            fmt(p.linear_mla[i]),
        ])
        .with_context(|| format!("writing {}", path.display()))?;
    }

    w.flush()
        .with_context(|| format!("flushing {}", path.display()))
}

/// Project-level voxelization configuration: the shared domain, grid
/// shape, and the scan-name to grid-file mapping consumed by the
/// multi-position model step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxelProjectConfig {
    pub bounds: [f64; 6],
    pub resolution: f64,
    pub nx: u64,
    pub ny: u64,
    pub nz: u64,
    pub nodata: i64,
    pub dtm: Option<String>,
    pub positions: BTreeMap<String, Vec<String>>,
}

pub fn build_voxel_config(
    outcomes: &[Outcome<VoxelizeOut>],
    bounds: &Bounds,
    resolution: f64,
    nodata: i64,
    dtm: Option<String>,
) -> VoxelProjectConfig {
    let (nx, ny, nz) = bounds.grid_dims(resolution);
    let mut positions = BTreeMap::new();
    for outcome in outcomes {
        if let Outcome::Success {
            scan_name, payload, ..
        } = outcome
        {
            positions.insert(scan_name.clone(), payload.filenames.clone());
        }
    }
    VoxelProjectConfig {
        bounds: bounds.to_array(),
        resolution,
        nx,
        ny,
        nz,
        nodata,
        dtm,
        positions,
    }
}

/// Write the voxelization config artifact. With zero successes nothing
/// is written and 0 is returned.
pub fn write_voxel_config(
    outcomes: &[Outcome<VoxelizeOut>],
    bounds: &Bounds,
    resolution: f64,
    nodata: i64,
    dtm: Option<String>,
    path: &Path,
) -> Result<usize> {
    let config = build_voxel_config(outcomes, bounds, resolution, nodata, dtm);
    if config.positions.is_empty() {
        return Ok(0);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(&config)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(config.positions.len())
}
