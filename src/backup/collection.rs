//! Ordered backups of one destination
//!
//! A collection is always sorted newest first. Its total size is computed
//! once per collection; a fresh enumeration yields a fresh collection.

use std::cell::Cell;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::artifact::Backup;
use super::filename::has_archive_extension;
use crate::error::StewardResult;
use crate::storage::{Disk, ZIP_MIME_TYPE};

/// Backups of one destination, newest first
#[derive(Debug, Default)]
pub struct BackupCollection {
    backups: Vec<Backup>,
    size_cache: Cell<Option<u64>>,
}

impl BackupCollection {
    /// Create a collection, sorting the backups newest first
    pub fn new(mut backups: Vec<Backup>) -> Self {
        sort_newest_first(&mut backups);
        Self {
            backups,
            size_cache: Cell::new(None),
        }
    }

    /// A collection without backups
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a collection from a raw disk listing
    ///
    /// Paths that are not archives are skipped.
    pub fn from_files(disk: Arc<dyn Disk>, paths: Vec<String>) -> StewardResult<Self> {
        let mut backups = Vec::new();
        for path in paths {
            if !is_archive(disk.as_ref(), &path) {
                continue;
            }
            backups.push(Backup::discover(Arc::clone(&disk), path)?);
        }
        Ok(Self::new(backups))
    }

    /// The most recent backup
    pub fn newest(&self) -> Option<&Backup> {
        self.backups.first()
    }

    /// The least recent backup that still exists
    pub fn oldest(&self) -> StewardResult<Option<&Backup>> {
        for backup in self.backups.iter().rev() {
            if backup.exists()? {
                return Ok(Some(backup));
            }
        }
        Ok(None)
    }

    /// Total size of all backups in bytes, computed once
    pub fn size(&self) -> StewardResult<u64> {
        if let Some(size) = self.size_cache.get() {
            return Ok(size);
        }
        let refs: Vec<&Backup> = self.backups.iter().collect();
        let size = total_size(&refs)?;
        self.size_cache.set(Some(size));
        Ok(size)
    }

    /// Delete every backup except the newest
    pub fn delete_all_except_one(&self) -> StewardResult<usize> {
        let mut deleted = 0;
        for backup in self.backups.iter().skip(1) {
            backup.delete()?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Delete every backup strictly older than `date`
    pub fn delete_older_than(&self, date: DateTime<Utc>) -> StewardResult<usize> {
        let mut deleted = 0;
        for backup in self.backups.iter().filter(|b| b.date() < date) {
            backup.delete()?;
            deleted += 1;
        }
        Ok(deleted)
    }

    pub fn len(&self) -> usize {
        self.backups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backups.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Backup> {
        self.backups.iter()
    }

    pub fn as_slice(&self) -> &[Backup] {
        &self.backups
    }
}

impl<'a> IntoIterator for &'a BackupCollection {
    type Item = &'a Backup;
    type IntoIter = std::slice::Iter<'a, Backup>;

    fn into_iter(self) -> Self::IntoIter {
        self.backups.iter()
    }
}

/// Sort backups newest first
pub fn sort_newest_first(backups: &mut [Backup]) {
    backups.sort_by(|a, b| b.date().cmp(&a.date()));
}

/// Combined size of a set of backups
pub fn total_size(backups: &[&Backup]) -> StewardResult<u64> {
    let mut total = 0u64;
    for backup in backups {
        total += backup.size_in_bytes()?;
    }
    Ok(total)
}

/// Whether a listed path is a backup archive, by extension or content type
pub fn is_archive(disk: &dyn Disk, path: &str) -> bool {
    has_archive_extension(path) || disk.mime_type(path).as_deref() == Some(ZIP_MIME_TYPE)
}
