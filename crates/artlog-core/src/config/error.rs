//! Configuration errors

use thiserror::Error;

/// Errors that can occur while loading or validating a logger configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("{kind} channel index {index} out of range (0..{limit})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        limit: usize,
    },

    #[error("{kind} channel index {index} configured more than once")]
    DuplicateIndex { kind: &'static str, index: usize },

    #[error("CAN channel {index} has {count} signals (maximum 4)")]
    TooManySignals { index: usize, count: usize },

    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}
