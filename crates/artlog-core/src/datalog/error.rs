//! Storage errors

use thiserror::Error;

/// Errors reported by a storage backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage is not mounted")]
    NotMounted,

    #[error("No log file is open")]
    NotOpen,

    #[error("Could not mount storage: {0}")]
    MountFailed(String),

    #[error("Could not open '{name}': {source}")]
    OpenFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Whether the error prevents a session from starting
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            StorageError::NotMounted | StorageError::MountFailed(_) | StorageError::OpenFailed { .. }
        )
    }
}
