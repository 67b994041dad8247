//! Document store adapters.
//!
//! [`FileStore`] persists the configuration JSON as one whole file on the
//! flash VFS (or any filesystem on the host). Writes go through a
//! temporary file followed by a rename so a power cut mid-write can never
//! leave a torn document, and a mutex serialises concurrent writers —
//! last writer wins, interleaved writes cannot happen.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use log::warn;

use crate::error::StoreError;
use crate::ports::DocumentStore;

pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

impl DocumentStore for FileStore {
    fn read(&self) -> Result<String, StoreError> {
        fs::read_to_string(&self.path).map_err(|e| {
            warn!("store: read of {} failed: {e}", self.path.display());
            StoreError::ReadFailed
        })
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap();
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, contents)
            .and_then(|()| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                warn!("store: write of {} failed: {e}", self.path.display());
                StoreError::WriteFailed
            })
    }
}

/// In-memory store for host tests: seeded with a document, records every
/// write, and can be switched to fail so persistence-failure paths are
/// testable.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
    fail_writes: std::sync::atomic::AtomicBool,
}

#[cfg(not(target_os = "espidf"))]
impl MemoryStore {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(document.into())),
            fail_writes: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Store with no document at all (read fails).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes
            .store(fail, std::sync::atomic::Ordering::Relaxed);
    }

    /// The last written document, if any write happened.
    pub fn written(&self) -> Option<String> {
        self.contents.lock().unwrap().clone()
    }
}

#[cfg(not(target_os = "espidf"))]
impl DocumentStore for MemoryStore {
    fn read(&self) -> Result<String, StoreError> {
        self.contents
            .lock()
            .unwrap()
            .clone()
            .ok_or(StoreError::ReadFailed)
    }

    fn write(&self, contents: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(StoreError::WriteFailed);
        }
        *self.contents.lock().unwrap() = Some(contents.to_owned());
        Ok(())
    }
}
