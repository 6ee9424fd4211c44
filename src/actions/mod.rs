//! Concrete actions
//!
//! Each action wires its own tasks and passable into the pipeline engine:
//!
//! - [`BackupAction`]: collect, dump, archive and copy to every destination
//! - [`CleanupAction`]: apply the retention strategy to every destination
//! - [`MonitorAction`]: run the configured health checks

pub mod archive;
pub mod backup;
pub mod cleanup;
pub mod dump;
pub mod manifest;
pub mod monitor;

pub use archive::{Archiver, ZipArchiver};
pub use backup::{BackupAction, BackupOptions, BackupPassable, CopiedBackup};
pub use cleanup::{CleanedDestination, CleanupAction, CleanupPassable};
pub use dump::{dump_filename, CommandDumper, DatabaseDumper};
pub use manifest::{archive_name, Manifest, ManifestEntry};
pub use monitor::{MonitorAction, MonitorPassable};
