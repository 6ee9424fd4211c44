//! Custom error types for backup-steward
//!
//! This module defines the error hierarchy for the application using thiserror
//! for ergonomic error definitions.

use thiserror::Error;

/// The main error type for backup-steward operations
#[derive(Error, Debug)]
pub enum StewardError {
    /// Configuration-related errors, always raised before anything destructive
    #[error("Configuration error: {0}")]
    Config(String),

    /// A disk could not be resolved, listed or reached
    #[error("Could not connect to disk {disk}: {reason}")]
    Connectivity { disk: String, reason: String },

    /// A destination was asked to write but has no disk at all
    #[error("There is no disk set for the backup destination {backup_name}")]
    NoDiskConfigured { backup_name: String },

    /// Writing an archive to a destination failed
    #[error("Could not write backup to disk {disk}: {reason}")]
    StorageWrite { disk: String, reason: String },

    /// Other storage collaborator failures (delete, stat, read)
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(String),

    /// Archive container errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// A database dump command failed
    #[error("Dump error: {0}")]
    Dump(String),

    /// The backup run selected nothing to archive
    #[error("There are no files to be backed up")]
    EmptyManifest,

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// A monitor run found unhealthy destinations
    #[error("{count} unhealthy backup destination(s) found")]
    Unhealthy { count: usize },
}

impl StewardError {
    /// Create a connectivity error for a disk
    pub fn connectivity(disk: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connectivity {
            disk: disk.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a write error for a disk
    pub fn storage_write(disk: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageWrite {
            disk: disk.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(entity_type: &'static str, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            identifier: identifier.into(),
        }
    }

    /// Check if this is a connectivity error
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connectivity { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for StewardError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StewardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<serde_yaml::Error> for StewardError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err.to_string())
    }
}

impl From<zip::result::ZipError> for StewardError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Archive(err.to_string())
    }
}

/// Result type alias for backup-steward operations
pub type StewardResult<T> = Result<T, StewardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StewardError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
        assert!(err.is_config());
    }

    #[test]
    fn test_connectivity_error() {
        let err = StewardError::connectivity("s3", "timed out");
        assert_eq!(err.to_string(), "Could not connect to disk s3: timed out");
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_not_found_error() {
        let err = StewardError::not_found("Settings file", "/etc/steward.yaml");
        assert_eq!(err.to_string(), "Settings file not found: /etc/steward.yaml");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_no_disk_differs_from_connectivity() {
        let err = StewardError::NoDiskConfigured {
            backup_name: "app".into(),
        };
        assert!(!err.is_connectivity());
        assert!(err.to_string().contains("app"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let steward_err: StewardError = io_err.into();
        assert!(matches!(steward_err, StewardError::Io(_)));
    }
}
