//! Harness configuration loading.
//!
//! The TOML file is read into raw `Option` structs, then resolved into a
//! `HarnessConfig` with compiled patterns so the core never sees the file
//! format.
use crate::classify::{CapturePattern, PatternSet};
use crate::error::HarnessError;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "repeat_test.toml";

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    test: Option<RawTestSection>,
    #[serde(default)]
    parse: toml::Table,
}

#[derive(Debug, Default, Deserialize)]
struct RawTestSection {
    cmd: Option<String>,
    result_pattern: Option<String>,
    ok_pattern: Option<String>,
    fail_log_file: Option<String>,
    n_failures: Option<i64>,
    timeout_seconds: Option<f64>,
}

/// Fully resolved inputs for one harness invocation.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub cmd: String,
    pub patterns: PatternSet,
    pub fail_log_file: Option<PathBuf>,
    pub n_failures: usize,
    pub timeout: Option<Duration>,
    /// Non-fatal problems found while loading, e.g. skipped capture patterns.
    pub warnings: Vec<String>,
}

pub fn load_config(path: &Path) -> Result<HarnessConfig, HarnessError> {
    let text = fs::read_to_string(path)
        .map_err(|err| HarnessError::config(path, format!("read failed: {err}")))?;
    parse_config(&text, path)
}

/// Parse config text; `path` is only used in error messages.
pub fn parse_config(text: &str, path: &Path) -> Result<HarnessConfig, HarnessError> {
    let raw: RawConfig =
        toml::from_str(text).map_err(|err| HarnessError::config(path, err.to_string().trim_end()))?;
    let test = raw
        .test
        .ok_or_else(|| HarnessError::config(path, "missing [test] section"))?;

    let cmd = required(path, "cmd", test.cmd)?;
    let result_pattern = required(path, "result_pattern", test.result_pattern)?;
    let ok_pattern = required(path, "ok_pattern", test.ok_pattern)?;

    let n_failures = match test.n_failures {
        None => 1,
        Some(value) => usize::try_from(value)
            .ok()
            .filter(|value| *value >= 1)
            .ok_or_else(|| {
                HarnessError::config(path, format!("test.n_failures must be >= 1 (got {value})"))
            })?,
    };

    let timeout = test
        .timeout_seconds
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|limit| !limit.is_zero())
                .ok_or_else(|| {
                    HarnessError::config(
                        path,
                        format!("test.timeout_seconds must be a positive number (got {secs})"),
                    )
                })
        })
        .transpose()?;

    let mut warnings = Vec::new();
    let mut captures = Vec::new();
    for (key, value) in &raw.parse {
        let Some(pattern) = value.as_str() else {
            return Err(HarnessError::config(
                path,
                format!("parse.{key} must be a string pattern"),
            ));
        };
        let regex = compile_pattern(pattern, &format!("parse.{key}"))?;
        match CapturePattern::new(key.as_str(), regex) {
            Some(capture) => captures.push(capture),
            None => {
                tracing::debug!(key = key.as_str(), pattern, "capture pattern has no named group");
                warnings.push(format!(
                    "parse.{key} = {pattern:?} has no named group; ignoring it"
                ));
            }
        }
    }

    Ok(HarnessConfig {
        cmd,
        patterns: PatternSet {
            result: compile_pattern(&result_pattern, "test.result_pattern")?,
            outcome: compile_pattern(&ok_pattern, "test.ok_pattern")?,
            captures,
        },
        fail_log_file: test.fail_log_file.map(PathBuf::from),
        n_failures,
        timeout,
        warnings,
    })
}

fn required(path: &Path, key: &str, value: Option<String>) -> Result<String, HarnessError> {
    value.ok_or_else(|| HarnessError::config(path, format!("missing required key test.{key}")))
}

fn compile_pattern(pattern: &str, label: &str) -> Result<Regex, HarnessError> {
    Regex::new(pattern).map_err(|source| HarnessError::Pattern {
        label: label.to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
