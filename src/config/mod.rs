//! Configuration module for backup-steward
//!
//! This module provides configuration management including:
//! - Platform path resolution
//! - Settings loading (YAML or JSON) and validation

pub mod paths;
pub mod settings;

pub use paths::StewardPaths;
pub use settings::{
    BackupSettings, CleanupSettings, DatabaseSource, DestinationSettings, DiskConfig, DiskDriver,
    EncryptionMethod, HealthCheckConfig, MonitorSettings, RetentionSettings, Settings,
    SourceSettings, Visibility, WriteOptions,
};
