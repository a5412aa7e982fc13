//! Error taxonomy for the harness core.
//!
//! Configuration, pattern, parse and spawn errors are fatal. Failure-log
//! write errors surface as `Io` and the controller recovers from them.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("invalid pattern for {label}: {source}")]
    Pattern {
        label: String,
        #[source]
        source: regex::Error,
    },

    #[error("parse command line {command:?}: {message}")]
    Parse { command: String, message: String },

    #[error("spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl HarnessError {
    pub(crate) fn config(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
