//! Error types for jbod-net
//!
//! Errors shared by the outer layers (configuration loading, trace parsing).
//! Each library crate defines its own error enum for its own failure modes.

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for jbod-net operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for jbod-net
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a parse error for the given 1-based line
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: msg.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse(7, "unknown command FOO");
        assert_eq!(err.to_string(), "parse error at line 7: unknown command FOO");
    }
}
