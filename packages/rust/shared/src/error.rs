//! Error types for sheetbind.
//!
//! Library crates use [`SheetbindError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all sheetbind operations.
#[derive(Debug, thiserror::Error)]
pub enum SheetbindError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport failure or non-success HTTP status from the sheet endpoint.
    #[error("network error: {0}")]
    Network(String),

    /// Response body was not JSON or had no `values` field.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Table is missing required header columns or has no data rows.
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// Cached blob or timestamp could not be decoded.
    #[error("cache corruption: {0}")]
    CacheCorruption(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// HTML or selector parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SheetbindError>;

impl SheetbindError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a schema mismatch error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
