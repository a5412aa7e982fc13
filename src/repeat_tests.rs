use super::*;
use crate::classify::{classify_output, CapturePattern};
use crate::record::RunExit;
use regex::Regex;
use std::collections::VecDeque;

fn patterns() -> PatternSet {
    PatternSet {
        result: Regex::new("RESULT:").expect("compile result"),
        outcome: Regex::new("PASS").expect("compile outcome"),
        captures: vec![CapturePattern::new(
            "time",
            Regex::new(r"time=(?P<time>\d+)").expect("compile capture"),
        )
        .expect("named group")],
    }
}

/// Replays canned outputs instead of spawning processes.
#[derive(Debug)]
struct ScriptedExecutor {
    patterns: PatternSet,
    outputs: VecDeque<Vec<&'static str>>,
    calls: Vec<usize>,
}

impl ScriptedExecutor {
    fn new(outputs: Vec<Vec<&'static str>>) -> Self {
        Self {
            patterns: patterns(),
            outputs: outputs.into(),
            calls: Vec::new(),
        }
    }

    fn repeating(output: Vec<&'static str>, times: usize) -> Self {
        Self::new(vec![output; times])
    }
}

impl RunExecutor for ScriptedExecutor {
    fn execute(&mut self, index: usize) -> Result<RunRecord, HarnessError> {
        self.calls.push(index);
        let output = self
            .outputs
            .pop_front()
            .expect("executor called more times than scripted");
        let output = output.into_iter().map(str::to_string).collect();
        Ok(classify_output(
            &self.patterns,
            index,
            output,
            RunExit::default(),
        ))
    }
}

#[derive(Debug)]
struct FailingExecutor;

impl RunExecutor for FailingExecutor {
    fn execute(&mut self, _index: usize) -> Result<RunRecord, HarnessError> {
        Err(HarnessError::Spawn {
            program: "missing".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        })
    }
}

fn options(attempt_budget: usize, failure_budget: usize) -> RepeatOptions {
    RepeatOptions {
        attempt_budget,
        failure_budget,
    }
}

fn run<E: RunExecutor>(
    controller: &mut RepetitionController<E>,
) -> (RepeatSummary, String) {
    let mut out = Vec::new();
    let summary = controller.run(&mut out).expect("run controller");
    (summary, String::from_utf8(out).expect("utf8 console output"))
}

#[test]
fn passing_runs_use_the_whole_attempt_budget() {
    let executor = ScriptedExecutor::repeating(vec!["start", "RESULT: PASS", "end"], 3);
    let mut controller =
        RepetitionController::new(executor, options(3, 1), FailureLogWriter::new(None, 1));
    let (summary, console) = run(&mut controller);

    assert_eq!(summary.attempts_run, 3);
    assert_eq!(summary.failures_found, 0);
    assert!(!summary.stopped_early);
    assert_eq!(controller.executor.calls, [0, 1, 2]);
    assert_eq!(console, "== 0: OK\n== 1: OK\n== 2: OK\n");
}

#[test]
fn every_run_failing_stops_at_failure_budget() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("fail.log");
    let executor = ScriptedExecutor::repeating(vec!["RESULT: FAIL"], 5);
    let mut controller = RepetitionController::new(
        executor,
        options(5, 2),
        FailureLogWriter::new(Some(base.clone()), 2),
    );
    let (summary, console) = run(&mut controller);

    assert_eq!(summary.attempts_run, 2);
    assert_eq!(summary.failures_found, 2);
    assert!(summary.stopped_early);
    assert_eq!(controller.executor.calls, [0, 1]);
    assert!(dir.path().join("fail.log_0").is_file());
    assert!(dir.path().join("fail.log_1").is_file());
    assert!(!dir.path().join("fail.log_2").exists());
    assert!(!base.exists());
    assert!(console.contains(&format!(
        "== fail log in file {}",
        dir.path().join("fail.log_1").display()
    )));
}

#[test]
fn single_failure_budget_writes_base_path_once() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("fail.log");
    let executor = ScriptedExecutor::new(vec![
        vec!["RESULT: PASS"],
        vec!["boom", "RESULT: FAIL"],
        vec!["RESULT: PASS"],
    ]);
    let mut controller = RepetitionController::new(
        executor,
        options(3, 1),
        FailureLogWriter::new(Some(base.clone()), 1),
    );
    let (summary, console) = run(&mut controller);

    assert_eq!(summary.attempts_run, 2);
    assert_eq!(summary.runs[1].fail_log.as_deref(), Some(base.as_path()));
    assert_eq!(
        std::fs::read_to_string(&base).expect("read fail log"),
        "boom\nRESULT: FAIL\n"
    );
    let entries = std::fs::read_dir(dir.path()).expect("list dir").count();
    assert_eq!(entries, 1);
    assert!(console.starts_with("== 0: OK\n== 1: FAIL\nboom\nRESULT: FAIL\n"));
}

#[test]
fn unknown_verdict_counts_as_failure() {
    let executor = ScriptedExecutor::new(vec![vec!["no verdict here"], vec!["RESULT: PASS"]]);
    let mut controller =
        RepetitionController::new(executor, options(2, 1), FailureLogWriter::new(None, 1));
    let (summary, console) = run(&mut controller);

    assert_eq!(summary.attempts_run, 1);
    assert_eq!(summary.failures_found, 1);
    assert_eq!(summary.runs[0].verdict, Verdict::Unknown);
    assert!(console.starts_with("== 0: UNKNOWN\n"));
}

#[test]
fn last_result_line_decides_the_run() {
    let executor = ScriptedExecutor::new(vec![vec!["RESULT: PASS", "RESULT: FAIL"]]);
    let mut controller =
        RepetitionController::new(executor, options(1, 1), FailureLogWriter::new(None, 1));
    let (summary, _) = run(&mut controller);
    assert_eq!(summary.runs[0].verdict, Verdict::Fail);
    assert_eq!(summary.failures_found, 1);
    assert!(!summary.stopped_early);
}

#[test]
fn failures_below_budget_let_the_loop_finish() {
    let executor = ScriptedExecutor::new(vec![
        vec!["RESULT: FAIL"],
        vec!["RESULT: PASS"],
        vec!["RESULT: PASS"],
    ]);
    let mut controller =
        RepetitionController::new(executor, options(3, 2), FailureLogWriter::new(None, 2));
    let (summary, _) = run(&mut controller);
    assert_eq!(summary.attempts_run, 3);
    assert_eq!(summary.failures_found, 1);
    assert!(!summary.stopped_early);
}

#[test]
fn progress_lines_carry_fields() {
    let executor = ScriptedExecutor::new(vec![vec!["time=3", "time=5", "RESULT: PASS"]]);
    let mut controller =
        RepetitionController::new(executor, options(1, 1), FailureLogWriter::new(None, 1));
    let (summary, console) = run(&mut controller);
    assert_eq!(console, "== 0: OK, time=3, time=5\n");
    assert_eq!(
        summary.runs[0].fields,
        [Field::new("time", "3"), Field::new("time", "5")]
    );
}

#[test]
fn fail_log_write_error_is_not_fatal() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let base = dir.path().join("missing-dir").join("fail.log");
    let executor = ScriptedExecutor::repeating(vec!["RESULT: FAIL"], 3);
    let mut controller = RepetitionController::new(
        executor,
        options(3, 2),
        FailureLogWriter::new(Some(base), 2),
    );
    let (summary, console) = run(&mut controller);

    assert_eq!(summary.attempts_run, 2);
    assert_eq!(summary.failures_found, 2);
    assert!(summary.runs.iter().all(|run| run.fail_log.is_none()));
    assert_eq!(console.matches("== fail log not written").count(), 2);
}

#[test]
fn executor_error_aborts_the_loop() {
    let mut controller =
        RepetitionController::new(FailingExecutor, options(3, 1), FailureLogWriter::new(None, 1));
    let mut out = Vec::new();
    let err = controller.run(&mut out).expect_err("spawn error propagates");
    assert!(matches!(err, HarnessError::Spawn { .. }));
    assert!(out.is_empty());
}

#[test]
fn command_executor_classifies_real_output() {
    let executor = CommandExecutor::new(
        r#"sh -c 'echo start; echo "time=7"; echo RESULT: PASS >&2'"#,
        patterns(),
        None,
    )
    .expect("parse command");
    let mut controller =
        RepetitionController::new(executor, options(2, 1), FailureLogWriter::new(None, 1));
    let (summary, console) = run(&mut controller);
    assert_eq!(summary.attempts_run, 2);
    assert_eq!(console, "== 0: OK, time=7\n== 1: OK, time=7\n");
    assert_eq!(summary.runs[0].exit_code, Some(0));
}

#[test]
fn command_executor_rejects_bad_quoting_before_running() {
    let err = CommandExecutor::new("sh -c 'echo", patterns(), None).expect_err("bad quoting");
    assert!(matches!(err, HarnessError::Parse { .. }));
}
