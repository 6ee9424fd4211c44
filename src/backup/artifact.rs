//! A single stored backup archive
//!
//! Existence and size are looked up lazily and cached. Once a backup has been
//! deleted it reports `exists() == false` and a size of zero without asking
//! the disk again.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::filename::parse_filename_date;
use crate::error::StewardResult;
use crate::storage::Disk;

/// One backup archive on a disk
pub struct Backup {
    disk: Arc<dyn Disk>,
    path: String,
    date: DateTime<Utc>,
    exists: Cell<Option<bool>>,
    size: Cell<Option<u64>>,
}

impl Backup {
    /// Create a backup with a known date
    pub fn new(disk: Arc<dyn Disk>, path: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            disk,
            path: path.into(),
            date,
            exists: Cell::new(None),
            size: Cell::new(None),
        }
    }

    /// Create a backup found on a disk
    ///
    /// The date comes from the filename; when the name carries no timestamp
    /// the disk's modification time is used instead.
    pub fn discover(disk: Arc<dyn Disk>, path: impl Into<String>) -> StewardResult<Self> {
        let path = path.into();
        let date = match parse_filename_date(&path) {
            Some(date) => date,
            None => disk.last_modified(&path)?,
        };
        Ok(Self::new(disk, path, date))
    }

    /// Path on the disk
    pub fn path(&self) -> &str {
        &self.path
    }

    /// When the backup was taken
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    /// Whether the archive is still on the disk
    pub fn exists(&self) -> StewardResult<bool> {
        if let Some(exists) = self.exists.get() {
            return Ok(exists);
        }
        let exists = self.disk.exists(&self.path)?;
        self.exists.set(Some(exists));
        Ok(exists)
    }

    /// Size in bytes; zero once the backup is gone
    pub fn size_in_bytes(&self) -> StewardResult<u64> {
        if !self.exists()? {
            return Ok(0);
        }
        if let Some(size) = self.size.get() {
            return Ok(size);
        }
        let size = self.disk.size(&self.path)?;
        self.size.set(Some(size));
        Ok(size)
    }

    /// Remove the archive from the disk
    pub fn delete(&self) -> StewardResult<()> {
        if self.exists.get() == Some(false) {
            return Ok(());
        }
        self.disk.delete(&self.path)?;
        self.exists.set(Some(false));
        self.size.set(None);
        info!(path = %self.path, "Deleted backup");
        Ok(())
    }
}

impl fmt::Debug for Backup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backup")
            .field("path", &self.path)
            .field("date", &self.date)
            .field("exists", &self.exists.get())
            .finish()
    }
}
