use crate::project::ScanPosition;
use anyhow::Result;
use tracing::info;

/// Tagged result of processing one scan position. Exactly one variant
/// per position, accumulated in processing order and never retried.
#[derive(Debug)]
pub enum Outcome<T> {
    Success {
        position: String,
        scan_name: String,
        payload: T,
    },
    Failure {
        position: String,
        scan_name: String,
        error: String,
    },
}

impl<T> Outcome<T> {
    pub fn position(&self) -> &str {
        match self {
            Outcome::Success { position, .. } | Outcome::Failure { position, .. } => position,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    /// Zero successes is a reportable terminal state, not a mid-loop
    /// error.
    pub fn no_work_done(&self) -> bool {
        self.succeeded == 0
    }
}

/// Invoke `process` once per position, in order, with no concurrency.
/// A failing position becomes a `Failure` outcome carrying the rendered
/// error chain, printed to stdout as it occurs; the batch never aborts
/// on a single position.
pub fn run_batch<T, F>(positions: &[ScanPosition], mut process: F) -> (Vec<Outcome<T>>, BatchSummary)
where
    F: FnMut(&ScanPosition) -> Result<T>,
{
    let total = positions.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut succeeded = 0;
    let mut failed = 0;

    for (i, pos) in positions.iter().enumerate() {
        info!("processing {} ({}/{})", pos.name, i + 1, total);
        match process(pos) {
            Ok(payload) => {
                succeeded += 1;
                outcomes.push(Outcome::Success {
                    position: pos.name.clone(),
                    scan_name: pos.scan_name.clone(),
                    payload,
                });
            }
            Err(err) => {
                let error = format!("{err:#}");
                println!("Error processing {}: {}", pos.name, error);
                failed += 1;
                outcomes.push(Outcome::Failure {
                    position: pos.name.clone(),
                    scan_name: pos.scan_name.clone(),
                    error,
                });
            }
        }
    }

    (
        outcomes,
        BatchSummary {
            attempted: total,
            succeeded,
            failed,
        },
    )
}
