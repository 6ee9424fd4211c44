//! Backup data model
//!
//! # Architecture
//!
//! - `Backup`: one archive on a disk, with lazily resolved existence and size
//! - `BackupCollection`: the backups of one destination, newest first
//! - `BackupDestination`: a named backup set on one disk, caching its backups
//! - `BackupDestinationCollection`: every destination of the configured backup
//!
//! # Naming
//!
//! Archives are named `<prefix>YYYYMMDD-HHMMSS.zip` and stored under the
//! sanitized backup name on every destination disk:
//!
//! ```text
//! <disk root>/my-app/20251127-143022.zip
//! ```

mod artifact;
mod collection;
mod destination;
mod destinations;
mod filename;

pub use artifact::Backup;
pub use collection::{is_archive, sort_newest_first, total_size, BackupCollection};
pub use destination::{sanitize_backup_name, BackupDestination};
pub use destinations::BackupDestinationCollection;
pub use filename::{archive_filename, basename, has_archive_extension, parse_filename_date};
