//! Error type shared by every sisi crate.
//!
//! Only recoverable failures are represented here. Broken invariants and
//! violated call contracts are programmer errors and panic at the call site.

use thiserror::Error;

/// Error type for sisi operations
#[derive(Error, Debug)]
pub enum SisiError {
    /// Bad option syntax, unknown key or malformed value
    #[error("configuration error: {0}")]
    Config(String),
    /// IO error when reading or writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed circuit or proof input
    #[error("format error at line {line}: {message}")]
    Format {
        /// 1-based line number (0 for binary sections)
        line: usize,
        /// What went wrong
        message: String,
    },
    /// The underlying SAT engine reported an internal failure
    #[error("solver error: {0}")]
    Solver(String),
    /// JSON serialization failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SisiError {
    /// Build a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        SisiError::Config(message.into())
    }

    /// Build a format error for the given line.
    pub fn format(line: usize, message: impl Into<String>) -> Self {
        SisiError::Format {
            line,
            message: message.into(),
        }
    }
}

/// Result type for sisi operations
pub type Result<T> = std::result::Result<T, SisiError>;
