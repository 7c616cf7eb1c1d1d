use anyhow::{Result, anyhow};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::warn;

/// Scan-position directories are `ScanPosNNN` under `<project>/SCANS`.
pub const POSITION_PREFIX: &str = "ScanPos";

const RAW_SCAN_EXT: &str = "rxp";
const RESIDUAL_SUFFIX: &str = ".residual.rxp";

/// Which directory-layout conventions are in play. Voxelization projects
/// additionally carry timestamp-named raw scans and a `SCANS/matrix`
/// transform directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Profiles,
    Voxelization,
}

/// Resolved file set for one scan position. Immutable once built; the
/// decimated `.rdbx` companion is optional and its absence only means
/// downstream processing falls back to the raw scan alone.
#[derive(Debug, Clone)]
pub struct ScanPosition {
    pub name: String,
    pub scan_name: String,
    pub rxp_file: PathBuf,
    pub rdbx_file: Option<PathBuf>,
    pub transform_file: PathBuf,
}

/// Result of walking a project: resolvable positions in lexical order,
/// plus the identifiers that had to be skipped.
#[derive(Debug)]
pub struct Discovery {
    pub positions: Vec<ScanPosition>,
    pub skipped: Vec<String>,
}

struct ResolveCtx<'a> {
    project: &'a Path,
    position: &'a str,
    /// `<project>/SCANS/<position>/SINGLESCANS`
    singlescans: PathBuf,
}

type PathResolver = fn(&ResolveCtx) -> Option<PathBuf>;

static PROFILE_RAW_RESOLVERS: [PathResolver; 2] = [nested_singlescan_rxp, loose_rxp];
static VOXEL_RAW_RESOLVERS: [PathResolver; 3] =
    [nested_singlescan_rxp, loose_rxp, timestamped_rxp];
static PROFILE_TRANSFORM_RESOLVERS: [PathResolver; 2] =
    [dat_dir_transform, rdb_mirror_transform];
static VOXEL_TRANSFORM_RESOLVERS: [PathResolver; 3] =
    [dat_dir_transform, rdb_mirror_transform, matrix_dir_transform];

/// Raw-scan conventions in priority order. First existing match wins.
fn raw_scan_resolvers(mode: ScanMode) -> &'static [PathResolver] {
    match mode {
        ScanMode::Profiles => &PROFILE_RAW_RESOLVERS,
        ScanMode::Voxelization => &VOXEL_RAW_RESOLVERS,
    }
}

/// Transform-file conventions in priority order.
fn transform_resolvers(mode: ScanMode) -> &'static [PathResolver] {
    match mode {
        ScanMode::Profiles => &PROFILE_TRANSFORM_RESOLVERS,
        ScanMode::Voxelization => &VOXEL_TRANSFORM_RESOLVERS,
    }
}

/// Standard RISCAN layout: `SINGLESCANS/<scan>/<scan>.rxp`. When more
/// than one subdirectory is present the lexically smallest that carries
/// a matching file wins.
fn nested_singlescan_rxp(ctx: &ResolveCtx) -> Option<PathBuf> {
    let mut dirs = list_names(&ctx.singlescans, |e| e.is_dir());
    dirs.sort();
    dirs.into_iter()
        .map(|d| ctx.singlescans.join(&d).join(format!("{d}.{RAW_SCAN_EXT}")))
        .find(|p| p.is_file())
}

/// Raw scans sitting directly in `SINGLESCANS`, excluding the
/// `.residual.rxp` secondary variant. First match by name.
fn loose_rxp(ctx: &ResolveCtx) -> Option<PathBuf> {
    let mut files = list_names(&ctx.singlescans, |e| e.is_file());
    files.sort();
    files
        .into_iter()
        .find(|f| f.ends_with(&format!(".{RAW_SCAN_EXT}")) && !f.ends_with(RESIDUAL_SUFFIX))
        .map(|f| ctx.singlescans.join(f))
}

/// Timestamp-named raw scans (`HHMMDD_HHMMSS.rxp`). The most recently
/// created file on disk wins; ties fall back to the file name.
fn timestamped_rxp(ctx: &ResolveCtx) -> Option<PathBuf> {
    let pattern = Regex::new(r"^\d{6}_\d{6}\.rxp$").expect("valid pattern");
    list_names(&ctx.singlescans, |e| e.is_file())
        .into_iter()
        .filter(|f| pattern.is_match(f))
        .map(|f| {
            let path = ctx.singlescans.join(&f);
            (creation_time(&path), f, path)
        })
        .max_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)))
        .map(|(_, _, path)| path)
}

fn dat_dir_transform(ctx: &ResolveCtx) -> Option<PathBuf> {
    existing(ctx.project.join("DAT").join(format!("{}.DAT", ctx.position)))
}

fn rdb_mirror_transform(ctx: &ResolveCtx) -> Option<PathBuf> {
    existing(
        ctx.project
            .join("project.rdb")
            .join("SCANS")
            .join(format!("{}.DAT", ctx.position)),
    )
}

fn matrix_dir_transform(ctx: &ResolveCtx) -> Option<PathBuf> {
    existing(
        ctx.project
            .join("SCANS")
            .join("matrix")
            .join(format!("{}.DAT", ctx.position)),
    )
}

/// Deterministic decimated-scan location. Existence-checked, never
/// searched.
fn decimated_scan_path(ctx: &ResolveCtx, scan_name: &str) -> Option<PathBuf> {
    existing(
        ctx.project
            .join("project.rdb")
            .join("SCANS")
            .join(ctx.position)
            .join("SINGLESCANS")
            .join(scan_name)
            .join(format!("{scan_name}.rdbx")),
    )
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.is_file().then_some(path)
}

fn list_names(dir: &Path, keep: fn(&Path) -> bool) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .filter_map(|e| e.ok())
        .filter(|e| keep(&e.path()))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect()
}

// Creation time is platform-dependent; filesystems without birth times
// fall back to the modification time, keeping the choice deterministic
// within a run.
fn creation_time(path: &Path) -> SystemTime {
    std::fs::metadata(path)
        .and_then(|m| m.created().or_else(|_| m.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// List the position identifiers under `<project>/SCANS`, filtered to
/// the `ScanPos` prefix, sorted ascending. A missing `SCANS` directory
/// means the path is not a RISCAN project and is a fatal error.
pub fn find_scan_positions(project: &Path) -> Result<Vec<String>> {
    let scans_dir = project.join("SCANS");
    if !scans_dir.is_dir() {
        return Err(anyhow!(
            "SCANS directory not found in {}",
            project.display()
        ));
    }

    let mut names: Vec<String> = list_names(&scans_dir, |e| e.is_dir())
        .into_iter()
        .filter(|n| n.starts_with(POSITION_PREFIX))
        .collect();
    names.sort();
    Ok(names)
}

/// Resolve the file set for one position. `None` means a required file
/// (raw scan or transform) could not be located under any convention
/// and the position is skipped.
pub fn resolve_position(project: &Path, position: &str, mode: ScanMode) -> Option<ScanPosition> {
    let ctx = ResolveCtx {
        project,
        position,
        singlescans: project.join("SCANS").join(position).join("SINGLESCANS"),
    };

    let rxp_file = raw_scan_resolvers(mode).iter().find_map(|r| r(&ctx))?;
    let scan_name = rxp_file.file_stem()?.to_string_lossy().into_owned();
    let transform_file = transform_resolvers(mode).iter().find_map(|r| r(&ctx))?;
    let rdbx_file = decimated_scan_path(&ctx, &scan_name);

    Some(ScanPosition {
        name: position.to_string(),
        scan_name,
        rxp_file,
        rdbx_file,
        transform_file,
    })
}

/// Walk the project and resolve every position, collecting skips
/// instead of aborting on them.
pub fn locate_positions(project: &Path, mode: ScanMode) -> Result<Discovery> {
    let mut positions = Vec::new();
    let mut skipped = Vec::new();

    for name in find_scan_positions(project)? {
        match resolve_position(project, &name, mode) {
            Some(pos) => positions.push(pos),
            None => {
                warn!("skipping {name}: missing required files");
                skipped.push(name);
            }
        }
    }

    Ok(Discovery { positions, skipped })
}
