//! Error types for brandscan.
//!
//! Library crates use [`BrandScanError`] via `thiserror`.
//! App crates (cli) wrap this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all brandscan operations.
#[derive(Debug, thiserror::Error)]
pub enum BrandScanError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the gateway (search, scrape, lookup).
    #[error("network error: {0}")]
    Network(String),

    /// Chat completion error (API failure or empty response).
    #[error("completion error: {0}")]
    Completion(String),

    /// Model output or response body could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Data validation error (schema mismatch, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Persistence error during the sync phase.
    #[error("sync error: {0}")]
    Sync(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BrandScanError>;

impl BrandScanError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = BrandScanError::config("missing gateway key");
        assert_eq!(err.to_string(), "config error: missing gateway key");

        let err = BrandScanError::Completion("model returned no choices".into());
        assert!(err.to_string().contains("no choices"));
    }
}
