//! Storage backends
//!
//! The logger only needs mount, open-for-append, write, flush and close.
//! [`FileStorage`] maps those onto a directory of the host filesystem;
//! [`MemoryStorage`] keeps files in memory and can inject failures.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::StorageError;

/// Block-storage collaborator
pub trait Storage: Send {
    /// Make the volume available
    fn mount(&mut self) -> Result<(), StorageError>;

    /// Open `name` for appending, creating it if missing
    fn open_append(&mut self, name: &str) -> Result<(), StorageError>;

    /// Append bytes to the open file
    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Push buffered bytes to the medium
    fn flush(&mut self) -> Result<(), StorageError>;

    /// Close the open file and unmount
    fn close(&mut self) -> Result<(), StorageError>;
}

/// Log files in a host directory
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    mounted: bool,
    file: Option<BufWriter<File>>,
}

impl FileStorage {
    /// Storage rooted at `root` (created on mount)
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            mounted: false,
            file: None,
        }
    }

    /// Directory holding the log files
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FileStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| StorageError::MountFailed(format!("{}: {e}", self.root.display())))?;
        if !self.root.is_dir() {
            return Err(StorageError::MountFailed(format!(
                "{} is not a directory",
                self.root.display()
            )));
        }
        self.mounted = true;
        Ok(())
    }

    fn open_append(&mut self, name: &str) -> Result<(), StorageError> {
        if !self.mounted {
            return Err(StorageError::NotMounted);
        }
        let path = self.root.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| StorageError::OpenFailed {
                name: name.to_string(),
                source,
            })?;
        tracing::debug!("Opened log file {}", path.display());
        self.file = Some(BufWriter::new(file));
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let file = self.file.as_mut().ok_or(StorageError::NotOpen)?;
        file.write_all(bytes)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        let file = self.file.as_mut().ok_or(StorageError::NotOpen)?;
        file.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StorageError> {
        self.mounted = false;
        match self.file.take() {
            Some(mut file) => {
                file.flush()?;
                Ok(())
            }
            None => Err(StorageError::NotOpen),
        }
    }
}

#[derive(Debug, Default)]
struct MemoryVolume {
    files: BTreeMap<String, Vec<u8>>,
    current: Option<String>,
    mounted: bool,
    opens: usize,
    fail_mount: bool,
    fail_writes: bool,
}

/// In-memory storage.
///
/// Clones share the same volume, so a test can keep a handle while the
/// logger owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    volume: Arc<Mutex<MemoryVolume>>,
}

impl MemoryStorage {
    /// Empty volume
    pub fn new() -> Self {
        Self::default()
    }

    /// Volume whose mount always fails
    pub fn unmountable() -> Self {
        let storage = Self::new();
        storage.volume().fail_mount = true;
        storage
    }

    /// Make every subsequent write fail (or succeed again)
    pub fn set_fail_writes(&self, fail: bool) {
        self.volume().fail_writes = fail;
    }

    /// Contents of `name` as text
    pub fn contents(&self, name: &str) -> String {
        self.volume()
            .files
            .get(name)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Number of successful opens
    pub fn open_count(&self) -> usize {
        self.volume().opens
    }

    /// Whether a file is currently open
    pub fn is_open(&self) -> bool {
        self.volume().current.is_some()
    }

    fn volume(&self) -> MutexGuard<'_, MemoryVolume> {
        self.volume.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn mount(&mut self) -> Result<(), StorageError> {
        let mut volume = self.volume();
        if volume.fail_mount {
            return Err(StorageError::MountFailed("no medium".to_string()));
        }
        volume.mounted = true;
        Ok(())
    }

    fn open_append(&mut self, name: &str) -> Result<(), StorageError> {
        let mut volume = self.volume();
        if !volume.mounted {
            return Err(StorageError::NotMounted);
        }
        volume.files.entry(name.to_string()).or_default();
        volume.current = Some(name.to_string());
        volume.opens += 1;
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        let mut volume = self.volume();
        if volume.fail_writes {
            return Err(io::Error::other("injected write failure").into());
        }
        let name = volume.current.clone().ok_or(StorageError::NotOpen)?;
        volume.files.entry(name).or_default().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        match self.volume().current {
            Some(_) => Ok(()),
            None => Err(StorageError::NotOpen),
        }
    }

    fn close(&mut self) -> Result<(), StorageError> {
        let mut volume = self.volume();
        volume.mounted = false;
        volume.current.take().map(|_| ()).ok_or(StorageError::NotOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_append_across_opens() {
        let mut storage = MemoryStorage::new();
        let handle = storage.clone();

        storage.mount().unwrap();
        storage.open_append("log.csv").unwrap();
        storage.write(b"a,").unwrap();
        storage.close().unwrap();

        storage.mount().unwrap();
        storage.open_append("log.csv").unwrap();
        storage.write(b"b,").unwrap();
        storage.close().unwrap();

        assert_eq!(handle.contents("log.csv"), "a,b,");
        assert_eq!(handle.open_count(), 2);
    }

    #[test]
    fn test_memory_requires_mount_and_open() {
        let mut storage = MemoryStorage::new();
        assert!(matches!(storage.open_append("x"), Err(StorageError::NotMounted)));
        storage.mount().unwrap();
        assert!(matches!(storage.write(b"x"), Err(StorageError::NotOpen)));
    }

    #[test]
    fn test_file_storage_appends() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("sd"));

        for chunk in ["one\n", "two\n"] {
            storage.mount().unwrap();
            storage.open_append("run.csv").unwrap();
            storage.write(chunk.as_bytes()).unwrap();
            storage.close().unwrap();
        }

        let text = fs::read_to_string(dir.path().join("sd/run.csv")).unwrap();
        assert_eq!(text, "one\ntwo\n");
    }

    #[test]
    fn test_file_storage_mount_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let mut storage = FileStorage::new(&blocker);
        let err = storage.mount().unwrap_err();
        assert!(err.is_setup_failure());
    }
}
