//! Console rendering.
//!
//! Everything the user reads on stdout goes through here; diagnostics go to
//! `tracing` on stderr instead.
use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::record::RunRecord;
use crate::repeat::RepeatSummary;
use std::io::Write;
use std::path::Path;

fn console(err: std::io::Error) -> HarnessError {
    HarnessError::io("write console output", err)
}

/// `== <index>: <verdict>[, <name>=<value>]*`
pub fn progress_line(record: &RunRecord) -> String {
    let mut line = format!("== {}: {}", record.index, record.verdict);
    if record.exit.timed_out {
        line.push_str(" (timed out)");
    }
    for field in &record.fields {
        line.push_str(&format!(", {}={}", field.name, field.value));
    }
    line
}

pub fn write_progress(out: &mut dyn Write, record: &RunRecord) -> Result<(), HarnessError> {
    writeln!(out, "{}", progress_line(record)).map_err(console)
}

pub fn write_output(out: &mut dyn Write, lines: &[String]) -> Result<(), HarnessError> {
    for line in lines {
        writeln!(out, "{line}").map_err(console)?;
    }
    Ok(())
}

pub fn write_fail_log_path(out: &mut dyn Write, path: &Path) -> Result<(), HarnessError> {
    writeln!(out, "== fail log in file {}", path.display()).map_err(console)
}

pub fn write_fail_log_error(out: &mut dyn Write, err: &HarnessError) -> Result<(), HarnessError> {
    writeln!(out, "== fail log not written: {err}").map_err(console)
}

/// Echo the resolved configuration before the first run.
pub fn write_config_echo(
    out: &mut dyn Write,
    config: &HarnessConfig,
    n_times: usize,
) -> Result<(), HarnessError> {
    let fail_log_file = match &config.fail_log_file {
        Some(path) => path.display().to_string(),
        None => "<none>".to_string(),
    };
    let timeout = match config.timeout {
        Some(limit) => limit.as_secs_f64().to_string(),
        None => "<none>".to_string(),
    };
    writeln!(out, "cmd: {}", config.cmd).map_err(console)?;
    writeln!(out, "result_pattern: {}", config.patterns.result.as_str()).map_err(console)?;
    writeln!(out, "ok_pattern: {}", config.patterns.outcome.as_str()).map_err(console)?;
    writeln!(out, "n_times: {n_times}").map_err(console)?;
    writeln!(out, "n_failures: {}", config.n_failures).map_err(console)?;
    writeln!(out, "fail_log_file: {fail_log_file}").map_err(console)?;
    writeln!(out, "timeout_seconds: {timeout}").map_err(console)?;
    for capture in &config.patterns.captures {
        writeln!(out, "parse.{}: {}", capture.key, capture.as_str()).map_err(console)?;
    }
    Ok(())
}

pub fn write_json_summary(out: &mut dyn Write, summary: &RepeatSummary) -> Result<(), HarnessError> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|err| HarnessError::io("serialize run summary", err.into()))?;
    writeln!(out, "{json}").map_err(console)
}
