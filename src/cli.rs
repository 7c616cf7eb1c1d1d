use crate::{
    batch::run_batch,
    bounds::compute_bounds,
    config::Config,
    engine::{Engine, ModelIn, ProfileIn, VoxelizeIn, python::PyCanopyEngine},
    project::{ScanMode, locate_positions},
    report::{self, ProfileRecord},
    transform::{read_transform_file, sensor_origin},
    util::{ensure_dir, project_stem},
};
use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "riscan-batch")]
#[command(about = "Batch TLS canopy processing for RISCAN projects")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./riscan-batch.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Batch vertical plant-profile (PAVD) processing for every scan
    /// position in a RISCAN project.
    Profiles(ProfilesCmd),
    /// Batch voxelization for every scan position in a RISCAN project.
    Voxelize(VoxelizeCmd),
}

#[derive(clap::Args, Debug)]
pub struct ProfilesCmd {
    /// Path to the RISCAN project directory (*.RiSCAN folder).
    pub riscan_project: PathBuf,

    /// Output directory for results.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Vertical height bin resolution in meters.
    #[arg(long)]
    pub hres: Option<f64>,

    /// Zenith angle bin resolution in degrees.
    #[arg(long)]
    pub zres: Option<f64>,

    /// Azimuth angle bin resolution in degrees.
    #[arg(long)]
    pub ares: Option<f64>,

    /// Minimum zenith angle in degrees.
    #[arg(long)]
    pub min_zenith: Option<f64>,

    /// Maximum zenith angle in degrees.
    #[arg(long)]
    pub max_zenith: Option<f64>,

    /// Minimum height in meters.
    #[arg(long, allow_negative_numbers = true)]
    pub min_height: Option<f64>,

    /// Maximum height in meters.
    #[arg(long, allow_negative_numbers = true)]
    pub max_height: Option<f64>,

    /// Minimum reflectance threshold.
    #[arg(long, allow_negative_numbers = true)]
    pub reflectance_threshold: Option<f64>,

    /// Pgap estimation method.
    #[arg(long, value_enum)]
    pub method: Option<PgapMethod>,
}

#[derive(clap::Args, Debug)]
pub struct VoxelizeCmd {
    /// Path to the RISCAN project directory (*.RiSCAN folder).
    pub riscan_project: PathBuf,

    /// Output directory for voxel grids.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Voxel grid resolution in meters.
    #[arg(long)]
    pub voxelsize: Option<f64>,

    /// Buffer to extend voxel bounds in meters.
    #[arg(long)]
    pub buffer: Option<f64>,

    /// Maximum tree height in meters.
    #[arg(long)]
    pub hmax: Option<f64>,

    /// Path to a DTM file in the same coordinate system as the scans.
    #[arg(long)]
    pub dtm: Option<PathBuf>,

    /// Do not save hit/miss/occluded count grids.
    #[arg(long)]
    pub no_counts: bool,

    /// Minimum number of Pgap observations required to estimate PAI.
    #[arg(long)]
    pub min_n: Option<u32>,

    /// Run the linear model to derive PAI and cover profiles after
    /// voxelization.
    #[arg(long)]
    pub run_model: bool,

    /// Use the weighted linear model (applies when --run-model is set).
    #[arg(long)]
    pub weighted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum PgapMethod {
    Weighted,
    First,
    All,
}

impl PgapMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PgapMethod::Weighted => "WEIGHTED",
            PgapMethod::First => "FIRST",
            PgapMethod::All => "ALL",
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        match raw {
            "WEIGHTED" => Ok(PgapMethod::Weighted),
            "FIRST" => Ok(PgapMethod::First),
            "ALL" => Ok(PgapMethod::All),
            other => Err(anyhow!("unknown Pgap method: {other}")),
        }
    }
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = load_config(args.config.as_deref())?;
    init_logging(&args, &cfg)?;

    match &args.cmd {
        Command::Profiles(cmd) => run_profiles(&cfg, cmd),
        Command::Voxelize(cmd) => run_voxelize(&cfg, cmd),
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = Path::new("riscan-batch.toml");
    if default.exists() {
        Config::load(default)
    } else {
        Ok(Config::default())
    }
}

fn init_logging(args: &Args, cfg: &Config) -> Result<()> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Both commands log to stdout only; no file layer.
    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(())
}

fn run_profiles(cfg: &Config, cmd: &ProfilesCmd) -> Result<()> {
    let mut p = cfg.profile.clone();
    if let Some(v) = cmd.hres {
        p.hres = v;
    }
    if let Some(v) = cmd.zres {
        p.zres = v;
    }
    if let Some(v) = cmd.ares {
        p.ares = v;
    }
    if let Some(v) = cmd.min_zenith {
        p.min_zenith = v;
    }
    if let Some(v) = cmd.max_zenith {
        p.max_zenith = v;
    }
    if let Some(v) = cmd.min_height {
        p.min_height = v;
    }
    if let Some(v) = cmd.max_height {
        p.max_height = v;
    }
    if let Some(v) = cmd.reflectance_threshold {
        p.reflectance_threshold = v;
    }
    let method = match cmd.method {
        Some(m) => m,
        None => PgapMethod::parse(&p.method)?,
    };
    let out_dir = cmd
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&p.out_dir));
    let project = cmd.riscan_project.as_path();

    println!("Scanning RISCAN project: {}", project.display());
    let discovery = locate_positions(project, ScanMode::Profiles)?;
    println!(
        "Found {} scan positions",
        discovery.positions.len() + discovery.skipped.len()
    );
    println!(
        "Processing {} scans with valid file sets ({} skipped)",
        discovery.positions.len(),
        discovery.skipped.len()
    );

    let engine = PyCanopyEngine::new(&cfg.engine)?;
    let (outcomes, summary) = run_batch(&discovery.positions, |pos| {
        let transform = read_transform_file(&pos.transform_file)?;
        let origin = sensor_origin(&transform);
        let req = ProfileIn {
            rxp_file: pos.rxp_file.display().to_string(),
            rdbx_file: pos.rdbx_file.as_ref().map(|f| f.display().to_string()),
            transform_file: pos.transform_file.display().to_string(),
            grid_extent: p.ground_grid_extent,
            grid_resolution: p.ground_grid_resolution,
            grid_origin: [origin.x, origin.y],
            hres: p.hres,
            zres: p.zres,
            ares: p.ares,
            min_zenith: p.min_zenith,
            max_zenith: p.max_zenith,
            min_height: p.min_height,
            max_height: p.max_height,
            reflectance_threshold: p.reflectance_threshold,
            method: method.as_str().to_string(),
        };
        let profile = engine.fit_profile(&req)?;
        Ok(ProfileRecord {
            sensor_origin: origin,
            profile,
        })
    });

    println!(
        "Processing complete: {} successful, {} failed",
        summary.succeeded, summary.failed
    );

    if summary.no_work_done() {
        bail!("no scans processed successfully");
    }

    let written = report::write_profile_reports(&outcomes, &out_dir, p.hres)?;
    println!(
        "Saved summary to {}",
        out_dir.join(report::SUMMARY_FILENAME).display()
    );
    println!(
        "Saved {written} detailed profile files to {}",
        out_dir.display()
    );

    Ok(())
}

fn run_voxelize(cfg: &Config, cmd: &VoxelizeCmd) -> Result<()> {
    let mut v = cfg.voxel.clone();
    if let Some(val) = cmd.voxelsize {
        v.voxelsize = val;
    }
    if let Some(val) = cmd.buffer {
        v.buffer = val;
    }
    if let Some(val) = cmd.hmax {
        v.hmax = val;
    }
    if let Some(val) = cmd.min_n {
        v.min_n = val;
    }
    let out_dir = cmd
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&v.out_dir));
    let dtm = cmd.dtm.as_ref().map(|d| d.display().to_string());
    let project = cmd.riscan_project.as_path();

    ensure_dir(&out_dir)?;

    println!("Scanning RISCAN project: {}", project.display());
    let discovery = locate_positions(project, ScanMode::Voxelization)?;
    println!(
        "Found {} scan positions",
        discovery.positions.len() + discovery.skipped.len()
    );
    println!(
        "Processing {} scans with valid file sets ({} skipped)",
        discovery.positions.len(),
        discovery.skipped.len()
    );

    println!("Computing voxelization bounds...");
    let mut origins = Vec::with_capacity(discovery.positions.len());
    for pos in &discovery.positions {
        let transform = read_transform_file(&pos.transform_file)
            .with_context(|| format!("reading transform for {}", pos.name))?;
        origins.push(sensor_origin(&transform));
    }
    let bounds = compute_bounds(&origins, v.buffer, v.hmax)?;
    let b = bounds.to_array();
    println!(
        "Bounds: xmin={:.1}, ymin={:.1}, zmin={:.1}, xmax={:.1}, ymax={:.1}, zmax={:.1}",
        b[0], b[1], b[2], b[3], b[4], b[5]
    );

    let engine = PyCanopyEngine::new(&cfg.engine)?;
    println!("Voxelizing scans...");
    let (outcomes, summary) = run_batch(&discovery.positions, |pos| {
        let req = VoxelizeIn {
            rxp_file: pos.rxp_file.display().to_string(),
            rdbx_file: pos.rdbx_file.as_ref().map(|f| f.display().to_string()),
            transform_file: pos.transform_file.display().to_string(),
            bounds: b,
            voxelsize: v.voxelsize,
            dtm: dtm.clone(),
            save_counts: !cmd.no_counts,
            out_prefix: out_dir.join(&pos.scan_name).display().to_string(),
        };
        engine.voxelize(&req)
    });

    println!(
        "Voxelization complete: {} successful, {} failed",
        summary.succeeded, summary.failed
    );

    let config_file = out_dir.join(format!("{}_config.json", project_stem(project)));
    let written = report::write_voxel_config(
        &outcomes,
        &bounds,
        v.voxelsize,
        v.nodata,
        dtm.clone(),
        &config_file,
    )?;
    if written > 0 {
        println!("Saved configuration to {}", config_file.display());
    }

    if summary.no_work_done() {
        bail!("no scans voxelized successfully");
    }

    if cmd.run_model {
        println!("Running linear model to derive PAI and cover profiles...");
        let model_out_dir = out_dir.join("model_output");
        ensure_dir(&model_out_dir)?;
        let model = engine
            .run_linear_model(&ModelIn {
                config_file: config_file.display().to_string(),
                min_n: v.min_n,
                weights: cmd.weighted,
                out_dir: model_out_dir.display().to_string(),
            })
            .context("running linear model")?;
        println!("Saved model outputs to {}", model_out_dir.display());
        println!("  PAI vertical shape: {:?}", model.paiv_shape);
        println!("  PAI horizontal shape: {:?}", model.paih_shape);
        println!("  Cover profile shape: {:?}", model.cover_shape);
    }

    Ok(())
}
