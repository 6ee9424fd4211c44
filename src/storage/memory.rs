//! In-memory disk
//!
//! Keeps files in process memory. Besides backing the `memory` driver it lets
//! callers inject failures (an unreachable disk, failing stats, deletes or
//! writes)
//! and records the order in which files were deleted.

use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::{sniff_mime_type, Disk};
use crate::config::WriteOptions;
use crate::error::{StewardError, StewardResult};

#[derive(Debug, Clone)]
struct MemoryFile {
    data: Vec<u8>,
    /// Reported size; may exceed `data.len()` for fixtures that fake large files
    size: u64,
    modified: DateTime<Utc>,
}

/// A disk that lives in memory
#[derive(Debug, Default)]
pub struct MemoryDisk {
    name: String,
    files: Mutex<BTreeMap<String, MemoryFile>>,
    deletions: Mutex<Vec<String>>,
    unreachable: AtomicBool,
    fail_stats: AtomicBool,
    fail_deletes: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryDisk {
    /// Create an empty disk
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Store a file with the given contents and modification time
    pub fn put(&self, path: &str, data: impl Into<Vec<u8>>, modified: DateTime<Utc>) {
        let data = data.into();
        let size = data.len() as u64;
        self.files().insert(
            path.to_string(),
            MemoryFile {
                data,
                size,
                modified,
            },
        );
    }

    /// Store a zip-signed placeholder that reports `size` bytes
    pub fn put_sized(&self, path: &str, size: u64, modified: DateTime<Utc>) {
        self.files().insert(
            path.to_string(),
            MemoryFile {
                data: b"PK\x03\x04".to_vec(),
                size,
                modified,
            },
        );
    }

    /// Make every listing fail as if the disk were offline
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make every size and modification time lookup fail
    pub fn set_fail_stats(&self, fail: bool) {
        self.fail_stats.store(fail, Ordering::SeqCst);
    }

    /// Make every delete fail
    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make every write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Paths deleted so far, in deletion order
    pub fn deletions(&self) -> Vec<String> {
        self.deletions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    /// Contents of a stored file
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        self.files().get(path).map(|f| f.data.clone())
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, MemoryFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_stat(&self, path: &str) -> StewardResult<()> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(StewardError::Storage(format!(
                "Failed to stat {} on disk {}",
                path, self.name
            )));
        }
        Ok(())
    }

    fn missing(&self, path: &str) -> StewardError {
        StewardError::Storage(format!("File {} does not exist on disk {}", path, self.name))
    }
}

impl Disk for MemoryDisk {
    fn list_files(&self, prefix: &str) -> StewardResult<Vec<String>> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StewardError::connectivity(&self.name, "disk is offline"));
        }

        let prefix = prefix.trim_matches('/');
        let folder = format!("{}/", prefix);
        Ok(self
            .files()
            .keys()
            .filter(|path| prefix.is_empty() || path.starts_with(&folder))
            .cloned()
            .collect())
    }

    fn exists(&self, path: &str) -> StewardResult<bool> {
        Ok(self.files().contains_key(path))
    }

    fn size(&self, path: &str) -> StewardResult<u64> {
        self.check_stat(path)?;
        self.files()
            .get(path)
            .map(|f| f.size)
            .ok_or_else(|| self.missing(path))
    }

    fn last_modified(&self, path: &str) -> StewardResult<DateTime<Utc>> {
        self.check_stat(path)?;
        self.files()
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| self.missing(path))
    }

    fn delete(&self, path: &str) -> StewardResult<bool> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StewardError::Storage(format!(
                "Refused to delete {} on disk {}",
                path, self.name
            )));
        }

        let removed = self.files().remove(path).is_some();
        if removed {
            self.deletions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(path.to_string());
        }
        Ok(removed)
    }

    fn read_stream(&self, path: &str) -> StewardResult<Box<dyn Read>> {
        let data = self.contents(path).ok_or_else(|| self.missing(path))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        _options: &WriteOptions,
    ) -> StewardResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StewardError::storage_write(&self.name, "disk is read-only"));
        }

        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| StewardError::storage_write(&self.name, e))?;
        self.put(path, data, Utc::now());
        Ok(())
    }

    fn mime_type(&self, path: &str) -> Option<String> {
        let files = self.files();
        let file = files.get(path)?;
        sniff_mime_type(&file.data[..file.data.len().min(4)])
    }
}
