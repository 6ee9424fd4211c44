//! Path management for backup-steward
//!
//! ## Path Resolution Order
//!
//! 1. `BACKUP_STEWARD_DIR` environment variable (if set)
//! 2. The platform configuration directory (`~/.config/backup-steward` on
//!    Linux, `~/Library/Application Support/...` on macOS, `%APPDATA%` on Windows)

use std::path::PathBuf;

use directories::ProjectDirs;

use crate::error::StewardError;

/// Environment variable overriding the base directory
pub const DIR_ENV_VAR: &str = "BACKUP_STEWARD_DIR";

/// Manages all paths used by backup-steward
#[derive(Debug, Clone)]
pub struct StewardPaths {
    /// Base directory for all steward state
    base_dir: PathBuf,
}

impl StewardPaths {
    /// Create a new StewardPaths instance
    ///
    /// # Errors
    ///
    /// Returns an error if no home directory can be determined.
    pub fn new() -> Result<Self, StewardError> {
        let base_dir = match std::env::var(DIR_ENV_VAR) {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => resolve_default_path()?,
        };

        Ok(Self { base_dir })
    }

    /// Create StewardPaths with a custom base directory (useful for testing)
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the path to the default configuration file
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.yaml")
    }

    /// Get the path to the event journal
    pub fn journal_file(&self) -> PathBuf {
        self.base_dir.join("events.log")
    }

    /// Get the directory that holds per-run temporary directories
    pub fn temp_dir(&self) -> PathBuf {
        self.base_dir.join("tmp")
    }

    /// Ensure the base and temporary directories exist
    pub fn ensure_directories(&self) -> Result<(), StewardError> {
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| StewardError::Io(format!("Failed to create base directory: {}", e)))?;

        std::fs::create_dir_all(self.temp_dir()).map_err(|e| {
            StewardError::Io(format!("Failed to create temporary directory: {}", e))
        })?;

        Ok(())
    }

    /// Check if a configuration file has been written
    pub fn is_initialized(&self) -> bool {
        self.config_file().exists()
    }
}

fn resolve_default_path() -> Result<PathBuf, StewardError> {
    ProjectDirs::from("", "", "backup-steward")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| StewardError::Config("Could not determine a home directory".into()))
}
