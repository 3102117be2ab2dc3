//! Centralized error types for mailcast.

use std::path::PathBuf;
use thiserror::Error;

/// All run-level errors produced by the mailcast library.
///
/// Per-record problems (validation failures, rejected recipients, exhausted
/// retries) never show up here: they are captured into the run log as an
/// outcome row instead. Anything in this enum aborts the run.
#[derive(Error, Debug)]
pub enum MailcastError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A required input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Missing credentials, a non-positive rate, a missing attachment, ...
    #[error("Configuration error: {0}")]
    Config(String),

    /// The template document could not be used.
    #[error("Template error in '{path}': {reason}")]
    Template { path: PathBuf, reason: String },

    /// Writing a row to the run log failed.
    #[error("Run log error: {0}")]
    Csv(#[from] csv::Error),

    /// The mail session could not be opened at run start.
    #[error("Could not open mail session: {0}")]
    Session(#[from] crate::transport::TransportError),
}

/// Convenience alias for `Result<T, MailcastError>`.
pub type Result<T> = std::result::Result<T, MailcastError>;

impl MailcastError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Map an `io::Error` on `path`, turning `NotFound` into [`Self::FileNotFound`].
    pub fn open(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path)
        } else {
            Self::io(path, source)
        }
    }

    /// Shorthand for a [`Self::Config`] error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}
