//! Data Logging
//!
//! Serializes sampled records as fixed-point CSV rows and appends them to a
//! storage backend.

mod error;
mod format;
mod recorder;
mod storage;

pub use error::StorageError;
pub use format::{header_line, push_fixed, row_line, ACCEL_HEADERS, ACCEL_PRECISION, GPS_HEADERS};
pub use recorder::DataLogger;
pub use storage::{FileStorage, MemoryStorage, Storage};
