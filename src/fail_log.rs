//! Persistence of failing run output.
use crate::error::HarnessError;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Chooses where each failing run's output goes.
///
/// With a budget of one failure the base path is used as is; larger budgets
/// suffix the base with the 0-based failure ordinal so files never collide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLogWriter {
    base: Option<PathBuf>,
    failure_budget: usize,
}

impl FailureLogWriter {
    pub fn new(base: Option<PathBuf>, failure_budget: usize) -> Self {
        Self {
            base,
            failure_budget,
        }
    }

    pub fn path_for(&self, failures_found: usize) -> Option<PathBuf> {
        let base = self.base.as_ref()?;
        if self.failure_budget <= 1 {
            return Some(base.clone());
        }
        let mut name = base.as_os_str().to_os_string();
        name.push(format!("_{failures_found}"));
        Some(PathBuf::from(name))
    }

    /// Write `output` and return the file used, or `None` when logging is off.
    pub fn write(
        &self,
        output: &[String],
        failures_found: usize,
    ) -> Result<Option<PathBuf>, HarnessError> {
        let Some(path) = self.path_for(failures_found) else {
            return Ok(None);
        };
        write_lines(&path, output)
            .map_err(|err| HarnessError::io(format!("write fail log {}", path.display()), err))?;
        tracing::debug!(path = %path.display(), lines = output.len(), "fail log written");
        Ok(Some(path))
    }
}

fn write_lines(path: &Path, lines: &[String]) -> std::io::Result<()> {
    let mut out = BufWriter::new(fs::File::create(path)?);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}
