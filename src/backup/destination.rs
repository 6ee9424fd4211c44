//! Backup destinations
//!
//! A destination is one named backup set on one disk. It enumerates its
//! backups lazily, caches the result until [`BackupDestination::fresh`] is
//! called, and remembers the last connection failure for diagnostics.

use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::artifact::Backup;
use super::collection::BackupCollection;
use crate::config::WriteOptions;
use crate::error::{StewardError, StewardResult};
use crate::storage::{join_path, Disk, DiskRegistry};

/// One named backup set on one disk
pub struct BackupDestination {
    disk: Option<Arc<dyn Disk>>,
    disk_name: String,
    backup_name: String,
    write_options: WriteOptions,
    connection_error: Option<StewardError>,
    cached_backups: Option<BackupCollection>,
}

impl BackupDestination {
    /// Create a destination on an already resolved disk
    pub fn new(
        disk: Option<Arc<dyn Disk>>,
        disk_name: impl Into<String>,
        backup_name: &str,
    ) -> Self {
        Self {
            disk,
            disk_name: disk_name.into(),
            backup_name: sanitize_backup_name(backup_name),
            write_options: WriteOptions::default(),
            connection_error: None,
            cached_backups: None,
        }
    }

    /// Create a destination by resolving a disk name
    ///
    /// This never fails: a disk that cannot be resolved leaves the destination
    /// without a disk and with the failure recorded as its connection error.
    pub fn create(registry: &DiskRegistry, disk_name: &str, backup_name: &str) -> Self {
        match registry.resolve(disk_name) {
            Ok(disk) => Self::new(Some(disk), disk_name, backup_name)
                .with_write_options(registry.write_options(disk_name)),
            Err(err) => {
                warn!(disk = %disk_name, error = %err, "Backup destination has no usable disk");
                let mut destination = Self::new(None, disk_name, backup_name);
                destination.connection_error = Some(err);
                destination
            }
        }
    }

    /// Set the options used when writing backups
    pub fn with_write_options(mut self, write_options: WriteOptions) -> Self {
        self.write_options = write_options;
        self
    }

    pub fn disk_name(&self) -> &str {
        &self.disk_name
    }

    /// Sanitized backup name, also the folder on the disk
    pub fn backup_name(&self) -> &str {
        &self.backup_name
    }

    /// The last connection failure, if any
    pub fn connection_error(&self) -> Option<&StewardError> {
        self.connection_error.as_ref()
    }

    /// Whether a disk is attached
    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    /// All backups, newest first
    ///
    /// A disk that cannot be listed yields an empty collection; the failure
    /// is kept as the connection error.
    pub fn backups(&mut self) -> &BackupCollection {
        if self.cached_backups.is_none() {
            let collection = self.enumerate();
            self.cached_backups = Some(collection);
        }
        self.cached_backups.get_or_insert_with(BackupCollection::empty)
    }

    fn enumerate(&mut self) -> BackupCollection {
        let Some(disk) = self.disk.clone() else {
            return BackupCollection::empty();
        };

        let listing = disk
            .list_files(&self.backup_name)
            .and_then(|files| BackupCollection::from_files(disk, files));

        match listing {
            Ok(collection) => {
                debug!(
                    disk = %self.disk_name,
                    backup = %self.backup_name,
                    count = collection.len(),
                    "Enumerated backups"
                );
                collection
            }
            Err(err) => {
                warn!(disk = %self.disk_name, error = %err, "Could not list backups");
                self.connection_error = Some(err);
                BackupCollection::empty()
            }
        }
    }

    /// Drop the cached backups so the next call re-enumerates
    pub fn fresh(&mut self) -> &mut Self {
        self.cached_backups = None;
        self
    }

    /// Copy a local file into this destination
    ///
    /// Returns the path the file was stored under.
    pub fn write(&mut self, file: &Path) -> StewardResult<String> {
        if self.connection_error.is_some() {
            return Err(self.connection_failure());
        }

        let disk = self
            .disk
            .as_ref()
            .ok_or_else(|| StewardError::NoDiskConfigured {
                backup_name: self.backup_name.clone(),
            })?;

        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| {
                StewardError::storage_write(
                    &self.disk_name,
                    format!("{} has no file name", file.display()),
                )
            })?;
        let destination = join_path(&self.backup_name, &filename);

        // The handle is closed when it goes out of scope, on every path.
        let mut handle =
            File::open(file).map_err(|e| StewardError::storage_write(&self.disk_name, e))?;

        disk.write_stream(&destination, &mut handle, &self.write_options)
            .map_err(|err| match err {
                StewardError::StorageWrite { .. } => err,
                other => StewardError::storage_write(&self.disk_name, other),
            })?;

        info!(disk = %self.disk_name, path = %destination, "Copied backup to destination");
        self.cached_backups = None;
        Ok(destination)
    }

    /// Try to list the destination; a failure is recorded as the connection error
    pub fn is_reachable(&mut self) -> bool {
        let Some(disk) = self.disk.as_ref() else {
            return false;
        };

        match disk.list_files(&self.backup_name) {
            Ok(_) => {
                self.connection_error = None;
                true
            }
            Err(err) => {
                warn!(disk = %self.disk_name, error = %err, "Backup destination is not reachable");
                self.connection_error = Some(err);
                false
            }
        }
    }

    /// The connection error as a connectivity error for this disk
    pub fn connection_failure(&self) -> StewardError {
        match &self.connection_error {
            Some(StewardError::Connectivity { disk, reason }) => StewardError::Connectivity {
                disk: disk.clone(),
                reason: reason.clone(),
            },
            Some(other) => StewardError::connectivity(&self.disk_name, other),
            None => StewardError::connectivity(&self.disk_name, "unknown error"),
        }
    }

    /// The most recent backup
    pub fn newest_backup(&mut self) -> Option<&Backup> {
        self.backups().newest()
    }

    /// The least recent backup that still exists
    pub fn oldest_backup(&mut self) -> StewardResult<Option<&Backup>> {
        self.backups().oldest()
    }

    /// Whether the newest backup is older than `date`; true without backups
    pub fn newest_backup_is_older_than(&mut self, date: DateTime<Utc>) -> bool {
        self.newest_backup().map_or(true, |backup| backup.date() < date)
    }

    /// Total size of all backups in bytes
    pub fn used_storage(&mut self) -> StewardResult<u64> {
        self.backups().size()
    }
}

impl fmt::Debug for BackupDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupDestination")
            .field("disk_name", &self.disk_name)
            .field("backup_name", &self.backup_name)
            .field("has_disk", &self.disk.is_some())
            .field("connection_error", &self.connection_error)
            .finish()
    }
}

/// Replace everything except ASCII letters, digits and dots with `-`
pub fn sanitize_backup_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}
