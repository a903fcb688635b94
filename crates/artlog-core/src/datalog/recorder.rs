//! Session log writer
//!
//! Wraps a [`Storage`] backend with the logger's failure policy: mount and
//! open errors abort the session, everything after that is reported and
//! execution continues.

use super::{Storage, StorageError};

/// Writes one session's header and rows
pub struct DataLogger<S> {
    /// Storage backend
    storage: S,
    /// Currently open file, if any
    file_name: Option<String>,
    /// Rows appended successfully this session
    rows_written: u64,
    /// Writes that failed this session (header included)
    write_failures: u64,
}

impl<S: Storage> DataLogger<S> {
    /// Create a logger over `storage`; nothing is mounted yet
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            file_name: None,
            rows_written: 0,
            write_failures: 0,
        }
    }

    /// Mount, open `file_name` for append and write the header
    pub fn open(&mut self, file_name: &str, header: &str) -> Result<(), StorageError> {
        if self.is_open() {
            self.close();
        }
        self.rows_written = 0;
        self.write_failures = 0;

        self.storage.mount().inspect_err(|e| {
            tracing::error!("Could not mount the drive: {e}");
        })?;
        self.storage.open_append(file_name).inspect_err(|e| {
            tracing::error!("Could not open the file: {e}");
        })?;
        self.file_name = Some(file_name.to_string());
        tracing::info!("Logging to {file_name}");

        if let Err(e) = self.storage.write(header.as_bytes()) {
            self.write_failures += 1;
            tracing::error!("Could not write header: {e}");
        }
        Ok(())
    }

    /// Append one row; failures are logged and counted
    pub fn append(&mut self, row: &str) {
        match self.storage.write(row.as_bytes()) {
            Ok(()) => self.rows_written += 1,
            Err(e) => {
                self.write_failures += 1;
                tracing::error!("Could not write data row: {e}");
            }
        }
    }

    /// Flush and close the open file
    pub fn close(&mut self) {
        let Some(name) = self.file_name.take() else {
            return;
        };
        if let Err(e) = self.storage.flush() {
            tracing::error!("Could not flush {name}: {e}");
        }
        if let Err(e) = self.storage.close() {
            tracing::error!("Could not close {name}: {e}");
        }
        tracing::debug!(
            rows = self.rows_written,
            failures = self.write_failures,
            "Closed {name}"
        );
    }

    /// Whether a file is open
    pub fn is_open(&self) -> bool {
        self.file_name.is_some()
    }

    /// Rows written since the last open
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Failed writes since the last open
    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    /// Storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consume the logger, returning the backend
    pub fn into_storage(mut self) -> S {
        self.close();
        let Self { storage, .. } = self;
        storage
    }
}
