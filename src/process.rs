//! Child process execution.
//!
//! The child's stdout and stderr share one pipe, so lines arrive in the order
//! the child wrote them. End of stream, not process exit, ends a run.
use crate::error::HarnessError;
use crate::record::RunExit;
use std::io::{BufRead, BufReader, PipeReader};
use std::process::{Child, Command};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// How long to poll for the exit status once output has ended.
const EXIT_GRACE: Duration = Duration::from_millis(200);

/// A tokenized command line, validated before any run is attempted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    raw: String,
    argv: Vec<String>,
}

impl CommandLine {
    /// Split `raw` with shell-style quoting rules.
    pub fn parse(raw: &str) -> Result<Self, HarnessError> {
        let argv = shell_words::split(raw).map_err(|err| HarnessError::Parse {
            command: raw.to_string(),
            message: err.to_string(),
        })?;
        if argv.is_empty() {
            return Err(HarnessError::Parse {
                command: raw.to_string(),
                message: "command is empty".to_string(),
            });
        }
        Ok(Self {
            raw: raw.to_string(),
            argv,
        })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Spawn `command` and stream its merged output.
///
/// With `timeout` set, a watchdog kills the child once the deadline passes;
/// without it, a child that never closes its output blocks forever.
pub fn spawn_lines(
    command: &CommandLine,
    timeout: Option<Duration>,
) -> Result<OutputLines, HarnessError> {
    let (reader, writer) =
        std::io::pipe().map_err(|err| HarnessError::io("create output pipe", err))?;
    let stderr = writer
        .try_clone()
        .map_err(|err| HarnessError::io("clone output pipe", err))?;

    // The Command owns the parent's write ends; dropping it at the end of this
    // block is what lets the reader see end of stream.
    let child = {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args()).stdout(writer).stderr(stderr);
        cmd.spawn().map_err(|source| HarnessError::Spawn {
            program: command.program().to_string(),
            source,
        })?
    };
    tracing::debug!(pid = child.id(), command = command.as_str(), "spawned");

    let child = Arc::new(Mutex::new(child));
    let watchdog = timeout.map(|limit| Watchdog::start(Arc::clone(&child), limit));
    Ok(OutputLines {
        reader: BufReader::new(reader),
        child,
        watchdog,
        buf: Vec::new(),
        exhausted: false,
        finished: false,
    })
}

/// Lazy, non-restartable sequence of trimmed output lines from one child.
#[derive(Debug)]
pub struct OutputLines {
    reader: BufReader<PipeReader>,
    child: Arc<Mutex<Child>>,
    watchdog: Option<Watchdog>,
    buf: Vec<u8>,
    exhausted: bool,
    finished: bool,
}

impl Iterator for OutputLines {
    type Item = Result<String, HarnessError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.exhausted = true;
                None
            }
            Ok(_) => Some(Ok(String::from_utf8_lossy(&self.buf).trim().to_string())),
            Err(err) => {
                self.exhausted = true;
                Some(Err(HarnessError::io("read command output", err)))
            }
        }
    }
}

impl OutputLines {
    /// Drain any remaining output and collect the exit status if the child
    /// has exited. A child still running after its output closed is left to a
    /// background reaper and reported with no exit code.
    pub fn finish(mut self) -> Result<RunExit, HarnessError> {
        while self.next().is_some() {}
        self.finished = true;
        let timed_out = self.watchdog.take().is_some_and(Watchdog::stop);
        let code = self.poll_exit_code()?;
        if code.is_none() {
            reap_in_background(Arc::clone(&self.child));
        }
        Ok(RunExit { code, timed_out })
    }

    fn poll_exit_code(&self) -> Result<Option<i32>, HarnessError> {
        let started = Instant::now();
        loop {
            let status = self
                .child
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .try_wait()
                .map_err(|err| HarnessError::io("check command status", err))?;
            if let Some(status) = status {
                return Ok(status.code());
            }
            if started.elapsed() >= EXIT_GRACE {
                tracing::debug!("command still running after end of output");
                return Ok(None);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

fn reap_in_background(child: Arc<Mutex<Child>>) {
    std::thread::spawn(move || {
        let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = child.wait() {
            tracing::debug!(error = %err, "failed to reap detached command");
        }
    });
}

impl Drop for OutputLines {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.stop();
        }
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = child.kill();
        let _ = child.wait();
    }
}

#[derive(Debug)]
struct Watchdog {
    done: mpsc::Sender<()>,
    handle: JoinHandle<bool>,
}

impl Watchdog {
    fn start(child: Arc<Mutex<Child>>, limit: Duration) -> Self {
        let (done, stopped) = mpsc::channel::<()>();
        let handle = std::thread::spawn(move || {
            if !matches!(
                stopped.recv_timeout(limit),
                Err(mpsc::RecvTimeoutError::Timeout)
            ) {
                return false;
            }
            let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
            if matches!(child.try_wait(), Ok(Some(_))) {
                return false;
            }
            if let Err(err) = child.kill() {
                tracing::warn!(error = %err, "failed to kill timed out command");
            }
            tracing::warn!(
                pid = child.id(),
                timeout_ms = limit.as_millis(),
                "command timed out"
            );
            true
        });
        Self { done, handle }
    }

    /// Returns whether the watchdog killed the child.
    fn stop(self) -> bool {
        drop(self.done);
        self.handle.join().unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
