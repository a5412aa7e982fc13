//! Repetition loop.
//!
//! Runs the test command sequentially until the attempt budget is spent or
//! the failure budget is reached. Runs are numbered from zero and failure logs
//! are indexed by the failure ordinal, so runs must never overlap.
use crate::classify::{LineClassifier, PatternSet};
use crate::error::HarnessError;
use crate::fail_log::FailureLogWriter;
use crate::process::{spawn_lines, CommandLine};
use crate::record::{Field, RunRecord, Verdict};
use crate::report;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// Produces one classified run per call.
pub trait RunExecutor {
    fn execute(&mut self, index: usize) -> Result<RunRecord, HarnessError>;
}

/// Runs a real command and classifies its merged output line by line.
#[derive(Debug)]
pub struct CommandExecutor {
    command: CommandLine,
    patterns: PatternSet,
    timeout: Option<Duration>,
}

impl CommandExecutor {
    /// Tokenizes `cmd` up front so quoting errors surface before any run.
    pub fn new(
        cmd: &str,
        patterns: PatternSet,
        timeout: Option<Duration>,
    ) -> Result<Self, HarnessError> {
        Ok(Self {
            command: CommandLine::parse(cmd)?,
            patterns,
            timeout,
        })
    }
}

impl RunExecutor for CommandExecutor {
    fn execute(&mut self, index: usize) -> Result<RunRecord, HarnessError> {
        let mut lines = spawn_lines(&self.command, self.timeout)?;
        let mut classifier = LineClassifier::new(&self.patterns);
        let mut output = Vec::new();
        for line in lines.by_ref() {
            let line = line?;
            classifier.observe(&line);
            output.push(line);
        }
        let exit = lines.finish()?;
        let record = classifier.finish(index, output, exit);
        tracing::debug!(
            index,
            lines = record.output.len(),
            exit_code = ?record.exit.code,
            verdict = %record.verdict,
            "run finished"
        );
        Ok(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatOptions {
    pub attempt_budget: usize,
    pub failure_budget: usize,
}

/// Counters for one harness invocation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RepetitionState {
    pub attempts_run: usize,
    /// Runs that did not pass, `Unknown` verdicts included.
    pub failures_found: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub index: usize,
    pub verdict: Verdict,
    pub fields: Vec<Field>,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub fail_log: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepeatSummary {
    pub attempts_run: usize,
    pub failures_found: usize,
    pub attempt_budget: usize,
    pub failure_budget: usize,
    /// The failure budget ended the loop before the attempt budget did.
    pub stopped_early: bool,
    pub runs: Vec<RunSummary>,
}

#[derive(Debug)]
pub struct RepetitionController<E> {
    executor: E,
    options: RepeatOptions,
    fail_log: FailureLogWriter,
}

impl<E: RunExecutor> RepetitionController<E> {
    pub fn new(executor: E, options: RepeatOptions, fail_log: FailureLogWriter) -> Self {
        Self {
            executor,
            options,
            fail_log,
        }
    }

    /// Run the loop, writing the console report to `out`.
    ///
    /// Executor errors (parse, spawn, stream read) abort the loop. A failure
    /// log that cannot be written is reported and the loop continues.
    pub fn run(&mut self, out: &mut dyn Write) -> Result<RepeatSummary, HarnessError> {
        let mut state = RepetitionState::default();
        let mut runs = Vec::new();

        for index in 0..self.options.attempt_budget {
            let record = self.executor.execute(index)?;
            state.attempts_run += 1;
            report::write_progress(out, &record)?;

            let mut fail_log = None;
            if !record.passed() {
                report::write_output(out, &record.output)?;
                match self.fail_log.write(&record.output, state.failures_found) {
                    Ok(Some(path)) => {
                        report::write_fail_log_path(out, &path)?;
                        fail_log = Some(path);
                    }
                    Ok(None) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, index, "fail log not written");
                        report::write_fail_log_error(out, &err)?;
                    }
                }
                state.failures_found += 1;
            }

            runs.push(RunSummary {
                index: record.index,
                verdict: record.verdict,
                fields: record.fields,
                exit_code: record.exit.code,
                timed_out: record.exit.timed_out,
                fail_log,
            });

            if state.failures_found >= self.options.failure_budget {
                break;
            }
        }

        Ok(RepeatSummary {
            attempts_run: state.attempts_run,
            failures_found: state.failures_found,
            attempt_budget: self.options.attempt_budget,
            failure_budget: self.options.failure_budget,
            stopped_early: state.failures_found >= self.options.failure_budget
                && state.attempts_run < self.options.attempt_budget,
            runs,
        })
    }
}

#[cfg(test)]
#[path = "repeat_tests.rs"]
mod tests;
