//! Local filesystem disk
//!
//! Stores files below a root directory. A root that does not exist is treated
//! as an unreachable disk (an unmounted drive), while a missing folder below
//! the root simply has no files.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use super::{sniff_mime_type, Disk};
use crate::config::{Visibility, WriteOptions};
use crate::error::{StewardError, StewardResult};

/// A disk rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalDisk {
    name: String,
    root: PathBuf,
}

impl LocalDisk {
    /// Create a disk rooted at `root`
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a disk path onto the filesystem, refusing to leave the root
    fn resolve(&self, path: &str) -> StewardResult<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(StewardError::Storage(format!(
                "Path escapes the root of disk {}: {}",
                self.name, path
            )));
        }
        Ok(self.root.join(relative))
    }

    fn to_disk_path(&self, full: &Path) -> Option<String> {
        let relative = full.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        Some(parts.join("/"))
    }

    fn storage_error(&self, action: &str, path: &str, err: impl std::fmt::Display) -> StewardError {
        StewardError::Storage(format!(
            "Failed to {} {} on disk {}: {}",
            action, path, self.name, err
        ))
    }
}

impl Disk for LocalDisk {
    fn list_files(&self, prefix: &str) -> StewardResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(StewardError::connectivity(
                &self.name,
                format!("root directory {} does not exist", self.root.display()),
            ));
        }

        let dir = self.resolve(prefix)?;
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&dir).follow_links(false) {
            let entry = entry.map_err(|e| self.storage_error("list", prefix, e))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(path) = self.to_disk_path(entry.path()) {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    fn exists(&self, path: &str) -> StewardResult<bool> {
        Ok(self.resolve(path)?.is_file())
    }

    fn size(&self, path: &str) -> StewardResult<u64> {
        let metadata =
            fs::metadata(self.resolve(path)?).map_err(|e| self.storage_error("stat", path, e))?;
        Ok(metadata.len())
    }

    fn last_modified(&self, path: &str) -> StewardResult<DateTime<Utc>> {
        let modified = fs::metadata(self.resolve(path)?)
            .and_then(|m| m.modified())
            .map_err(|e| self.storage_error("stat", path, e))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn delete(&self, path: &str) -> StewardResult<bool> {
        let full = self.resolve(path)?;
        if !full.is_file() {
            return Ok(false);
        }
        fs::remove_file(&full).map_err(|e| self.storage_error("delete", path, e))?;
        Ok(true)
    }

    fn read_stream(&self, path: &str) -> StewardResult<Box<dyn Read>> {
        let file = File::open(self.resolve(path)?).map_err(|e| self.storage_error("open", path, e))?;
        Ok(Box::new(file))
    }

    fn write_stream(
        &self,
        path: &str,
        reader: &mut dyn Read,
        options: &WriteOptions,
    ) -> StewardResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| StewardError::storage_write(&self.name, e))?;
        }

        let mut file = File::create(&full).map_err(|e| StewardError::storage_write(&self.name, e))?;
        io::copy(reader, &mut file).map_err(|e| StewardError::storage_write(&self.name, e))?;
        file.sync_all()
            .map_err(|e| StewardError::storage_write(&self.name, e))?;

        if options.visibility == Visibility::Private {
            restrict_permissions(&full).map_err(|e| StewardError::storage_write(&self.name, e))?;
        }

        Ok(())
    }

    fn mime_type(&self, path: &str) -> Option<String> {
        let mut file = File::open(self.resolve(path).ok()?).ok()?;
        let mut header = [0u8; 4];
        let read = file.read(&mut header).ok()?;
        sniff_mime_type(&header[..read])
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}
