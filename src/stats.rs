//! Resets the tool's statistics so the job's summary starts from zero

use std::path::Path;
use std::process::{Command, ExitStatus};

pub trait SccacheCmd {
    fn zero_stats(&self, bin: &Path) -> Result<(), StatsError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SccacheCommandLine;

impl SccacheCmd for SccacheCommandLine {
    fn zero_stats(&self, bin: &Path) -> Result<(), StatsError> {
        log::debug!("Running {} --zero-stats", bin.display());
        let output = Command::new(bin)
            .arg("--zero-stats")
            .output()
            .map_err(|e| StatsError {
                bin: bin.into(),
                source: StatsErrorKind::Spawn(e),
            })?;

        if !output.status.success() {
            return Err(StatsError {
                bin: bin.into(),
                source: StatsErrorKind::Failed {
                    status: output.status,
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                },
            });
        }

        log::debug!("Statistics reset");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Failed to reset statistics with `{bin}`")]
#[non_exhaustive]
pub struct StatsError {
    pub bin: Box<Path>,
    pub source: StatsErrorKind,
}

#[derive(Debug, thiserror::Error)]
pub enum StatsErrorKind {
    #[error(transparent)]
    Spawn(#[from] std::io::Error),
    #[error("{status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}
