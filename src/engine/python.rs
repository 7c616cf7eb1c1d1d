use super::{Engine, types::*};
use crate::config::EngineCfg;
use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const PROFILE_SCRIPT: &str = "canopy_profile.py";
const VOXELIZE_SCRIPT: &str = "canopy_voxelize.py";
const MODEL_SCRIPT: &str = "canopy_model.py";

/// Runs the canopy-analysis library through its Python helper scripts:
/// JSON request on stdin, JSON response on stdout.
pub struct PyCanopyEngine {
    cfg: EngineCfg,
    scripts_dir: PathBuf,
    python_exe: PathBuf,
}

impl PyCanopyEngine {
    pub fn new(cfg: &EngineCfg) -> Result<Self> {
        let scripts_dir = PathBuf::from(&cfg.scripts_dir);
        for script in [PROFILE_SCRIPT, VOXELIZE_SCRIPT, MODEL_SCRIPT] {
            let path = scripts_dir.join(script);
            if !path.exists() {
                return Err(anyhow!("missing script: {}", path.display()));
            }
        }
        let python_exe = resolve_python_exe(&cfg.python_exe);
        Ok(Self {
            cfg: cfg.clone(),
            scripts_dir,
            python_exe,
        })
    }

    fn script(&self, name: &str) -> PathBuf {
        self.scripts_dir.join(name)
    }

    fn run_json<I: serde::Serialize, O: for<'de> serde::Deserialize<'de>>(
        &self,
        script: &Path,
        input: &I,
    ) -> Result<O> {
        let timeout = (self.cfg.timeout_seconds > 0)
            .then(|| Duration::from_secs(self.cfg.timeout_seconds));
        debug!("python run {} timeout={:?}", script.display(), timeout);

        let mut cmd = Command::new(&self.python_exe);
        cmd.arg(script);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning python: {}", script.display()))?;

        {
            let mut stdin = child.stdin.take().ok_or_else(|| anyhow!("no stdin"))?;
            let bytes = serde_json::to_vec(input)?;
            use std::io::Write;
            stdin.write_all(&bytes)?;
            stdin.flush().ok();
        }

        let output = if let Some(limit) = timeout {
            wait_with_timeout(&mut child, limit)?
        } else {
            child
                .wait_with_output()
                .with_context(|| "waiting for python")?
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "python script failed: {}\n{}",
                script.display(),
                stderr
            ));
        }

        if !output.stderr.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("python stderr {}: {}", script.display(), stderr.trim());
        }

        let out: O = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("parsing python JSON output: {}", script.display()))?;
        Ok(out)
    }
}

fn resolve_python_exe(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("auto") {
        if let Ok(env_val) = std::env::var("PYLIDAR_PYTHON") {
            let p = expand_tilde(&env_val);
            if p.exists() {
                return p;
            }
        }
        return PathBuf::from("python3");
    }
    expand_tilde(raw)
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

impl Engine for PyCanopyEngine {
    fn fit_profile(&self, req: &ProfileIn) -> Result<ProfileOut> {
        let out: ProfileOut = self.run_json(&self.script(PROFILE_SCRIPT), req)?;
        if !out.ok {
            let msg = out
                .error
                .unwrap_or_else(|| "profile fit failed".to_string());
            return Err(anyhow!(msg));
        }
        Ok(out)
    }

    fn voxelize(&self, req: &VoxelizeIn) -> Result<VoxelizeOut> {
        let out: VoxelizeOut = self.run_json(&self.script(VOXELIZE_SCRIPT), req)?;
        if !out.ok {
            let msg = out
                .error
                .unwrap_or_else(|| "voxelization failed".to_string());
            return Err(anyhow!(msg));
        }
        Ok(out)
    }

    fn run_linear_model(&self, req: &ModelIn) -> Result<ModelOut> {
        let out: ModelOut = self.run_json(&self.script(MODEL_SCRIPT), req)?;
        if !out.ok {
            let msg = out
                .error
                .unwrap_or_else(|| "linear model failed".to_string());
            return Err(anyhow!(msg));
        }
        Ok(out)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so a chatty analysis run can't deadlock
    // the child on a full stdout/stderr buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("python process timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            let _ = stdout_thread.join();
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Err(anyhow!(
                "python process exceeded timeout ({:?}); stderr: {}",
                timeout,
                String::from_utf8_lossy(&stderr)
            ));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
