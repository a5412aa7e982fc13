//! Per-run result types.
use serde::Serialize;

/// Classification of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No line matched the result pattern.
    #[default]
    Unknown,
    Pass,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "UNKNOWN"),
            Self::Pass => write!(f, "OK"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// One extracted telemetry value. Names may repeat within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How the child's output stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunExit {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub timed_out: bool,
}

/// Result of one invocation of the test command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub index: usize,
    pub verdict: Verdict,
    pub output: Vec<String>,
    pub fields: Vec<Field>,
    pub exit: RunExit,
}

impl RunRecord {
    /// A timed-out run never passes, whatever its output said.
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass && !self.exit.timed_out
    }
}
