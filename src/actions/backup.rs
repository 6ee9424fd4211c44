//! The backup action
//!
//! ```text
//! ValidateOptions → PrepareTemporaryDirectory → CollectFiles
//!     → DumpDatabases → CreateArchive → CopyToDestinations
//! ```
//!
//! Everything is staged in a per-run temporary directory that is removed
//! once the later tasks return, whether they succeeded or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zeroize::Zeroizing;

use super::archive::{Archiver, ZipArchiver};
use super::dump::{dump_filename, CommandDumper, DatabaseDumper};
use super::manifest::Manifest;
use crate::backup::{archive_filename, has_archive_extension, BackupDestinationCollection};
use crate::config::{DatabaseSource, EncryptionMethod, Settings, SourceSettings};
use crate::error::{StewardError, StewardResult};
use crate::events::Event;
use crate::pipeline::{Action, Next, Passable, Pipeline, RunContext, Task};
use crate::storage::DiskRegistry;

/// Folder inside the archive that holds database dumps
pub const DUMP_DIRECTORY: &str = "db-dumps";

/// Options of one backup run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupOptions {
    /// Skip database dumps
    pub only_files: bool,
    /// Skip files
    pub only_db: bool,
    /// Copy to this disk only
    pub only_to_disk: Option<String>,
    /// Archive filename instead of the generated one
    pub filename: Option<String>,
}

/// Where the archive ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopiedBackup {
    pub disk: String,
    pub path: String,
}

/// State of one backup run
#[derive(Debug, Default, Serialize)]
pub struct BackupPassable {
    pub options: BackupOptions,
    #[serde(skip)]
    pub temporary_directory: Option<PathBuf>,
    #[serde(rename = "manifest_files")]
    pub manifest: Manifest,
    pub archive_filename: Option<String>,
    #[serde(skip)]
    pub archive_path: Option<PathBuf>,
    pub archive_size: Option<u64>,
    pub copied: Vec<CopiedBackup>,
}

impl BackupPassable {
    pub fn new(options: BackupOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    fn staging_directory(&self) -> StewardResult<&Path> {
        self.temporary_directory
            .as_deref()
            .ok_or_else(|| StewardError::Io("No temporary directory has been prepared".into()))
    }
}

impl Passable for BackupPassable {}

/// Creates an archive and copies it to every destination
pub struct BackupAction {
    settings: Settings,
    registry: Arc<DiskRegistry>,
    temporary_base: PathBuf,
    dumper: Arc<dyn DatabaseDumper>,
    now: Option<DateTime<Utc>>,
}

impl BackupAction {
    /// `temporary_base` is the directory per-run staging directories are created in
    pub fn new(settings: Settings, registry: Arc<DiskRegistry>, temporary_base: PathBuf) -> Self {
        Self {
            settings,
            registry,
            temporary_base,
            dumper: Arc::new(CommandDumper),
            now: None,
        }
    }

    pub fn with_dumper(mut self, dumper: Arc<dyn DatabaseDumper>) -> Self {
        self.dumper = dumper;
        self
    }

    /// Timestamp generated filenames with a fixed moment
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl Action for BackupAction {
    type Passable = BackupPassable;

    fn name(&self) -> &'static str {
        "backup"
    }

    fn pipeline(&self) -> Pipeline<BackupPassable> {
        let backup = &self.settings.backup;
        Pipeline::new()
            .through(ValidateOptions {
                disks: backup.destination.disks.clone(),
            })
            .through(PrepareTemporaryDirectory {
                base: self.temporary_base.clone(),
            })
            .through(CollectFiles {
                source: backup.source.clone(),
            })
            .through(DumpDatabases {
                databases: backup.source.databases.clone(),
                dumper: Arc::clone(&self.dumper),
            })
            .through(CreateArchive {
                filename_prefix: backup.destination.filename_prefix.clone(),
                password: backup.password.clone().map(Zeroizing::new),
                encryption: backup.encryption,
                now: self.now,
            })
            .through(CopyToDestinations {
                registry: Arc::clone(&self.registry),
                backup_name: backup.name.clone(),
                disks: backup.destination.disks.clone(),
            })
    }
}

/// Rejects option combinations before anything is written
pub struct ValidateOptions {
    disks: Vec<String>,
}

impl Task<BackupPassable> for ValidateOptions {
    fn name(&self) -> &'static str {
        "validate_options"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        let options = &passable.options;

        if options.only_db && options.only_files {
            return Err(StewardError::Config(
                "Cannot use `only-db` and `only-files` together".into(),
            ));
        }

        if let Some(filename) = &options.filename {
            if !has_archive_extension(filename) {
                return Err(StewardError::Config(format!(
                    "Filename `{}` must end in .zip",
                    filename
                )));
            }
            if filename.contains('/') || filename.contains('\\') {
                return Err(StewardError::Config(format!(
                    "Filename `{}` must not contain a path",
                    filename
                )));
            }
        }

        if let Some(disk) = &options.only_to_disk {
            if !self.disks.contains(disk) {
                return Err(StewardError::Config(format!(
                    "Disk `{}` is not configured as a backup destination",
                    disk
                )));
            }
        }

        next.run(passable, ctx)
    }
}

/// Creates the staging directory and removes it once the rest has run
pub struct PrepareTemporaryDirectory {
    base: PathBuf,
}

impl Task<BackupPassable> for PrepareTemporaryDirectory {
    fn name(&self) -> &'static str {
        "prepare_temporary_directory"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        fs::create_dir_all(&self.base).map_err(|e| {
            StewardError::Io(format!("Failed to create temporary directory: {}", e))
        })?;
        let staging = tempfile::Builder::new()
            .prefix("backup-")
            .tempdir_in(&self.base)
            .map_err(|e| {
                StewardError::Io(format!("Failed to create temporary directory: {}", e))
            })?;
        debug!(path = %staging.path().display(), "Prepared temporary directory");

        passable.temporary_directory = Some(staging.path().to_path_buf());
        let result = next.run(passable, ctx);
        passable.temporary_directory = None;
        passable.archive_path = None;

        let path = staging.path().to_path_buf();
        if let Err(err) = staging.close() {
            warn!(path = %path.display(), error = %err, "Could not remove temporary directory");
        }
        result
    }
}

/// Walks the include roots and adds every file that is not excluded
pub struct CollectFiles {
    source: SourceSettings,
}

impl CollectFiles {
    fn is_excluded(&self, path: &Path, staging: Option<&Path>) -> bool {
        self.source.exclude.iter().any(|excluded| path.starts_with(excluded))
            || staging.is_some_and(|staging| path.starts_with(staging))
    }
}

impl Task<BackupPassable> for CollectFiles {
    fn name(&self) -> &'static str {
        "collect_files"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        if passable.options.only_db {
            return next.run(passable, ctx);
        }

        let staging = passable.temporary_directory.clone();
        let relative_to = self.source.relative_path.as_deref();

        for root in &self.source.include {
            if !root.exists() {
                warn!(path = %root.display(), "Included path does not exist");
                continue;
            }

            let walker = WalkDir::new(root)
                .follow_links(self.source.follow_links)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !self.is_excluded(entry.path(), staging.as_deref()));

            for entry in walker {
                match entry {
                    Ok(entry) if entry.file_type().is_file() => {
                        passable.manifest.add_file(entry.path(), relative_to);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "Skipping unreadable path"),
                }
            }
        }

        debug!(files = passable.manifest.len(), "Collected files");
        next.run(passable, ctx)
    }
}

/// Runs every configured database dump into the staging directory
pub struct DumpDatabases {
    databases: Vec<DatabaseSource>,
    dumper: Arc<dyn DatabaseDumper>,
}

impl Task<BackupPassable> for DumpDatabases {
    fn name(&self) -> &'static str {
        "dump_databases"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        if passable.options.only_files || self.databases.is_empty() {
            return next.run(passable, ctx);
        }

        let dump_directory = passable.staging_directory()?.join(DUMP_DIRECTORY);
        fs::create_dir_all(&dump_directory).map_err(|e| {
            StewardError::Io(format!("Failed to create dump directory: {}", e))
        })?;

        for database in &self.databases {
            let filename = dump_filename(database);
            let target = dump_directory.join(&filename);
            self.dumper.dump(database, &target)?;
            passable
                .manifest
                .add(target, format!("{}/{}", DUMP_DIRECTORY, filename));
        }

        next.run(passable, ctx)
    }
}

/// Zips the manifest into the staging directory
pub struct CreateArchive {
    filename_prefix: String,
    password: Option<Zeroizing<String>>,
    encryption: EncryptionMethod,
    now: Option<DateTime<Utc>>,
}

impl Task<BackupPassable> for CreateArchive {
    fn name(&self) -> &'static str {
        "create_archive"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        if passable.manifest.is_empty() {
            return Err(StewardError::EmptyManifest);
        }
        ctx.emit(Event::ManifestCreated {
            file_count: passable.manifest.len(),
        });

        let filename = passable.options.filename.clone().unwrap_or_else(|| {
            archive_filename(&self.filename_prefix, self.now.unwrap_or_else(Utc::now))
        });
        let path = passable.staging_directory()?.join(&filename);

        let mut archiver = ZipArchiver::new();
        archiver.open(&path)?;
        if let Some(password) = &self.password {
            archiver.set_password(password);
            archiver.set_encryption(self.encryption);
        }
        for entry in passable.manifest.entries() {
            archiver.add_file(&entry.source, &entry.name)?;
        }
        let size = archiver.close()?;

        info!(archive = %filename, size, files = passable.manifest.len(), "Created archive");
        ctx.emit(Event::ArchiveCreated {
            path: filename.clone(),
            size,
        });

        passable.archive_filename = Some(filename);
        passable.archive_path = Some(path);
        passable.archive_size = Some(size);
        next.run(passable, ctx)
    }
}

/// Copies the archive to each destination, stopping at the first failure
pub struct CopyToDestinations {
    registry: Arc<DiskRegistry>,
    backup_name: String,
    disks: Vec<String>,
}

impl Task<BackupPassable> for CopyToDestinations {
    fn name(&self) -> &'static str {
        "copy_to_destinations"
    }

    fn handle(
        &self,
        passable: &mut BackupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, BackupPassable>,
    ) -> StewardResult<()> {
        let archive = passable
            .archive_path
            .clone()
            .ok_or_else(|| StewardError::Archive("No archive has been created".into()))?;

        let mut destinations =
            BackupDestinationCollection::for_disks(&self.registry, &self.backup_name, &self.disks);
        if let Some(disk) = &passable.options.only_to_disk {
            destinations = destinations.only_disk(disk)?;
        }

        for destination in destinations.iter_mut() {
            if !destination.is_reachable() {
                return Err(destination.connection_failure());
            }

            let path = destination.write(&archive)?;
            ctx.emit(Event::BackupCopied {
                disk: destination.disk_name().to_string(),
                backup_name: destination.backup_name().to_string(),
                path: path.clone(),
            });
            passable.copied.push(CopiedBackup {
                disk: destination.disk_name().to_string(),
                path,
            });
        }

        next.run(passable, ctx)
    }
}
