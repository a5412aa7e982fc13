//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A scratch directory holding one config file for `rtest`.
pub struct TestFixture {
    pub dir: TempDir,
    pub config_path: PathBuf,
}

impl TestFixture {
    /// Write `config` as `repeat_test.toml` inside a fresh temp dir.
    pub fn with_config(config: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let config_path = dir.path().join("repeat_test.toml");
        std::fs::write(&config_path, config).expect("write config");
        Self { dir, config_path }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Run `rtest` from the fixture dir with `--config` pointing at the fixture.
    pub fn run(&self, extra_args: &[&str]) -> RunOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_rtest"))
            .arg("--config")
            .arg(&self.config_path)
            .args(extra_args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("run rtest");
        RunOutput::from(output)
    }

    /// Run `rtest` with no `--config`, relying on the default file name.
    pub fn run_default_config(&self, extra_args: &[&str]) -> RunOutput {
        let output = Command::new(env!("CARGO_BIN_EXE_rtest"))
            .args(extra_args)
            .current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .output()
            .expect("run rtest");
        RunOutput::from(output)
    }
}

pub struct RunOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl RunOutput {
    /// Progress lines only (`== <index>: ...`).
    pub fn progress_lines(&self) -> Vec<&str> {
        self.stdout
            .lines()
            .filter(|line| {
                line.strip_prefix("== ")
                    .and_then(|rest| rest.split_once(':'))
                    .is_some_and(|(index, _)| index.parse::<usize>().is_ok())
            })
            .collect()
    }
}

/// Build a `[test]` config around `cmd` with `RESULT:` / `PASS` patterns.
pub fn config_for(cmd: &str, extra: &str) -> String {
    let cmd = toml::Value::String(cmd.to_string());
    format!("[test]\ncmd = {cmd}\nresult_pattern = \"RESULT:\"\nok_pattern = \"PASS\"\n{extra}")
}

pub fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("read file")
        .lines()
        .map(str::to_string)
        .collect()
}
