//! Storage layer for backup-steward
//!
//! A [`Disk`] is one object store that destinations read from and write to.
//! Paths are `/`-separated and relative to the disk root.

pub mod local;
pub mod memory;
pub mod registry;

use std::io::Read;

use chrono::{DateTime, Utc};

use crate::config::WriteOptions;
use crate::error::StewardResult;

pub use local::LocalDisk;
pub use memory::MemoryDisk;
pub use registry::DiskRegistry;

/// MIME type reported for zip archives
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// One storage backend
pub trait Disk: Send + Sync {
    /// Recursively list all files below `prefix`
    ///
    /// Fails when the disk itself cannot be reached.
    fn list_files(&self, prefix: &str) -> StewardResult<Vec<String>>;

    fn exists(&self, path: &str) -> StewardResult<bool>;

    /// Size in bytes
    fn size(&self, path: &str) -> StewardResult<u64>;

    fn last_modified(&self, path: &str) -> StewardResult<DateTime<Utc>>;

    /// Delete a file, returning whether something was removed
    fn delete(&self, path: &str) -> StewardResult<bool>;

    fn read_stream(&self, path: &str) -> StewardResult<Box<dyn Read>>;

    /// Store everything `reader` yields at `path`
    fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> StewardResult<()>;

    /// Best-effort MIME type; `None` when it cannot be determined
    fn mime_type(&self, path: &str) -> Option<String>;
}

/// Join a prefix and a file name with a single `/`
pub fn join_path(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

/// Sniff a zip signature from the first bytes of a file
pub(crate) fn sniff_mime_type(header: &[u8]) -> Option<String> {
    const ZIP_SIGNATURES: [&[u8]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

    if ZIP_SIGNATURES.iter().any(|sig| header.starts_with(sig)) {
        Some(ZIP_MIME_TYPE.to_string())
    } else if header.is_empty() {
        Some("application/x-empty".to_string())
    } else {
        Some("application/octet-stream".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("app", "a.zip"), "app/a.zip");
        assert_eq!(join_path("app/", "/a.zip"), "app/a.zip");
        assert_eq!(join_path("", "a.zip"), "a.zip");
    }

    #[test]
    fn test_sniff_mime_type() {
        assert_eq!(
            sniff_mime_type(b"PK\x03\x04rest").as_deref(),
            Some(ZIP_MIME_TYPE)
        );
        assert_eq!(
            sniff_mime_type(b"hello").as_deref(),
            Some("application/octet-stream")
        );
    }
}
