//! Acquisition errors

use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::datalog::StorageError;

/// Errors raised while setting up or running the sampling loop
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Sensor transaction did not complete within {0:?}")]
    TransactionTimeout(Duration),

    #[error("Sensor transaction failed with status {0:#04x}")]
    TransactionFailed(u8),

    #[error("No enabled channel is flagged as the logging trigger")]
    NoTrigger,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AcquisitionError {
    /// Whether the loop cannot continue after this error.
    ///
    /// A failed sensor transaction leaves stale values behind and is
    /// recoverable; everything else stops the driver.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AcquisitionError::TransactionFailed(_))
    }
}
