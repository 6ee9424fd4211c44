//! User settings for backup-steward
//!
//! Describes what gets backed up, where it is stored, how long it is kept
//! and which health checks guard each destination. Settings are read from
//! YAML, or JSON when the file ends in `.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths::StewardPaths;
use crate::error::StewardError;

/// A database to dump before archiving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSource {
    /// Name used for the dump file inside the archive
    pub name: String,
    /// Program and arguments; the dump is read from its stdout
    pub command: Vec<String>,
    /// Extension of the dump file
    #[serde(default = "default_dump_extension")]
    pub extension: String,
}

/// Which files go into a backup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Files and directories to include
    #[serde(default)]
    pub include: Vec<PathBuf>,
    /// Files and directories to leave out
    #[serde(default)]
    pub exclude: Vec<PathBuf>,
    /// Whether symlinks are followed while walking
    #[serde(default)]
    pub follow_links: bool,
    /// Prefix stripped from file names inside the archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<PathBuf>,
    /// Databases dumped into the archive
    #[serde(default)]
    pub databases: Vec<DatabaseSource>,
}

/// Where backups are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationSettings {
    /// Prefix for generated archive filenames
    #[serde(default)]
    pub filename_prefix: String,
    /// Disk names every backup is copied to
    #[serde(default = "default_disks")]
    pub disks: Vec<String>,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self {
            filename_prefix: String::new(),
            disks: default_disks(),
        }
    }
}

/// Archive encryption method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionMethod {
    Aes128,
    Aes192,
    #[default]
    Aes256,
}

/// The logical backup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSettings {
    /// Name of the backup; also the folder on every destination disk
    #[serde(default = "default_backup_name")]
    pub name: String,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub destination: DestinationSettings,
    /// Where per-run working directories are created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temporary_directory: Option<PathBuf>,
    /// Archive password; encryption is off without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub encryption: EncryptionMethod,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            name: default_backup_name(),
            source: SourceSettings::default(),
            destination: DestinationSettings::default(),
            temporary_directory: None,
            password: None,
            encryption: EncryptionMethod::default(),
        }
    }
}

/// Storage drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiskDriver {
    /// A directory on a mounted filesystem
    #[default]
    Local,
    /// Process memory; contents vanish when the process exits
    Memory,
}

/// Visibility of written files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Disk-specific options applied when writing a backup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    #[serde(default)]
    pub visibility: Visibility,
}

/// One configured disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    #[serde(default)]
    pub driver: DiskDriver,
    /// Root directory for the local driver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    #[serde(default)]
    pub write_options: WriteOptions,
}

/// Retention windows and the size ceiling used by the default strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Keep every backup younger than this many days
    pub keep_all_backups_for_days: u32,
    /// Then keep one backup per day for this many days
    pub keep_daily_backups_for_days: u32,
    /// Then one per ISO week for this many weeks
    pub keep_weekly_backups_for_weeks: u32,
    /// Then one per month for this many months
    pub keep_monthly_backups_for_months: u32,
    /// Then one per year for this many years
    pub keep_yearly_backups_for_years: u32,
    /// Delete oldest backups while the total exceeds this many megabytes
    pub delete_oldest_backups_when_using_more_megabytes_than: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            keep_all_backups_for_days: 7,
            keep_daily_backups_for_days: 16,
            keep_weekly_backups_for_weeks: 8,
            keep_monthly_backups_for_months: 4,
            keep_yearly_backups_for_years: 2,
            delete_oldest_backups_when_using_more_megabytes_than: 5000,
        }
    }
}

impl RetentionSettings {
    /// The size ceiling in bytes
    pub fn maximum_bytes(&self) -> u64 {
        self.delete_oldest_backups_when_using_more_megabytes_than
            .saturating_mul(1024 * 1024)
    }
}

/// Cleanup settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupSettings {
    #[serde(default)]
    pub default_strategy: RetentionSettings,
}

/// A configured health check, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthCheckConfig {
    /// Newest backup must be younger than this many days; `null` only
    /// requires that a backup exists
    MaximumAgeInDays(Option<u32>),
    /// Total backup size must stay at or below this many megabytes
    MaximumStorageInMegabytes(u64),
}

/// One monitored backup set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    pub name: String,
    pub disks: Vec<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub health_checks: Vec<HealthCheckConfig>,
}

/// User settings for backup-steward
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Schema version for migration support
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    #[serde(default)]
    pub backup: BackupSettings,

    #[serde(default = "default_disk_map")]
    pub disks: BTreeMap<String, DiskConfig>,

    #[serde(default)]
    pub cleanup: CleanupSettings,

    #[serde(default)]
    pub monitor_backups: Vec<MonitorSettings>,

    /// Event journal location; defaults to `events.log` in the base directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<PathBuf>,
}

fn default_schema_version() -> u32 {
    1
}

fn default_backup_name() -> String {
    "backup-steward".to_string()
}

fn default_disks() -> Vec<String> {
    vec!["local".to_string()]
}

fn default_dump_extension() -> String {
    "sql".to_string()
}

fn default_disk_map() -> BTreeMap<String, DiskConfig> {
    let mut disks = BTreeMap::new();
    disks.insert(
        "local".to_string(),
        DiskConfig {
            driver: DiskDriver::Local,
            root: Some(PathBuf::from("backups")),
            write_options: WriteOptions::default(),
        },
    );
    disks
}

impl Default for Settings {
    fn default() -> Self {
        let backup = BackupSettings::default();
        let monitor = MonitorSettings {
            name: backup.name.clone(),
            disks: backup.destination.disks.clone(),
            health_checks: vec![
                HealthCheckConfig::MaximumAgeInDays(Some(1)),
                HealthCheckConfig::MaximumStorageInMegabytes(5000),
            ],
        };

        Self {
            schema_version: default_schema_version(),
            backup,
            disks: default_disk_map(),
            cleanup: CleanupSettings::default(),
            monitor_backups: vec![monitor],
            journal: None,
        }
    }
}

impl Settings {
    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, StewardError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StewardError::Io(format!(
                "Failed to read settings file {}: {}",
                path.display(),
                e
            ))
        })?;

        let settings: Settings = if is_json(path) {
            serde_json::from_str(&contents).map_err(|e| {
                StewardError::Config(format!("Failed to parse settings file: {}", e))
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| {
                StewardError::Config(format!("Failed to parse settings file: {}", e))
            })?
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default location, or defaults if nothing is there
    pub fn load_or_default(paths: &StewardPaths) -> Result<Self, StewardError> {
        let config_file = paths.config_file();
        if config_file.exists() {
            Self::load(&config_file)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to disk
    pub fn save(&self, path: &Path) -> Result<(), StewardError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StewardError::Io(format!("Failed to create config directory: {}", e))
            })?;
        }

        let contents = if is_json(path) {
            serde_json::to_string_pretty(self).map_err(|e| {
                StewardError::Config(format!("Failed to serialize settings: {}", e))
            })?
        } else {
            serde_yaml::to_string(self).map_err(|e| {
                StewardError::Config(format!("Failed to serialize settings: {}", e))
            })?
        };

        std::fs::write(path, contents)
            .map_err(|e| StewardError::Io(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    /// Reject settings that cannot drive any action
    pub fn validate(&self) -> Result<(), StewardError> {
        if self.backup.name.trim().is_empty() {
            return Err(StewardError::Config("backup.name cannot be empty".into()));
        }

        if self.backup.destination.disks.is_empty() {
            return Err(StewardError::Config(
                "backup.destination.disks must name at least one disk".into(),
            ));
        }

        for monitor in &self.monitor_backups {
            if monitor.disks.is_empty() {
                return Err(StewardError::Config(format!(
                    "monitor_backups entry '{}' has no disks",
                    monitor.name
                )));
            }
        }

        for database in &self.backup.source.databases {
            if database.command.is_empty() {
                return Err(StewardError::Config(format!(
                    "database '{}' has an empty dump command",
                    database.name
                )));
            }
        }

        Ok(())
    }

    /// Where the event journal lives
    pub fn journal_path(&self, paths: &StewardPaths) -> PathBuf {
        self.journal
            .clone()
            .unwrap_or_else(|| paths.journal_file())
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        let retention = &settings.cleanup.default_strategy;
        assert_eq!(retention.keep_all_backups_for_days, 7);
        assert_eq!(retention.keep_yearly_backups_for_years, 2);
        assert_eq!(retention.maximum_bytes(), 5000 * 1024 * 1024);
        assert_eq!(settings.backup.destination.disks, vec!["local".to_string()]);
        assert!(settings.disks.contains_key("local"));
        settings.validate().unwrap();
    }

    #[test]
    fn test_huge_size_ceiling_saturates() {
        let retention = RetentionSettings {
            delete_oldest_backups_when_using_more_megabytes_than: u64::MAX / 1024,
            ..RetentionSettings::default()
        };
        assert_eq!(retention.maximum_bytes(), u64::MAX);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
backup:
  name: my-app
  source:
    include: [/var/www]
  destination:
    filename_prefix: "nightly-"
    disks: [local, offsite]
disks:
  local:
    driver: local
    root: /srv/backups
  offsite:
    driver: memory
cleanup:
  default_strategy:
    keep_all_backups_for_days: 3
    keep_daily_backups_for_days: 10
    keep_weekly_backups_for_weeks: 4
    keep_monthly_backups_for_months: 6
    keep_yearly_backups_for_years: 1
    delete_oldest_backups_when_using_more_megabytes_than: 100
monitor_backups:
  - name: my-app
    disks: [local]
    health_checks:
      - maximum_age_in_days: 1
      - maximum_storage_in_megabytes: 100
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        settings.validate().unwrap();

        assert_eq!(settings.backup.name, "my-app");
        assert_eq!(settings.backup.destination.filename_prefix, "nightly-");
        assert_eq!(settings.disks["offsite"].driver, DiskDriver::Memory);
        assert_eq!(
            settings.cleanup.default_strategy.keep_all_backups_for_days,
            3
        );
        assert_eq!(
            settings.monitor_backups[0].health_checks,
            vec![
                HealthCheckConfig::MaximumAgeInDays(Some(1)),
                HealthCheckConfig::MaximumStorageInMegabytes(100),
            ]
        );
    }

    #[test]
    fn test_save_and_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        let mut settings = Settings::default();
        settings.backup.name = "db-server".into();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.backup.name, "db-server");
        assert_eq!(loaded.monitor_backups.len(), 1);
    }

    #[test]
    fn test_save_and_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");

        let settings = Settings::default();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(
            loaded.monitor_backups[0].health_checks,
            settings.monitor_backups[0].health_checks
        );
    }

    #[test]
    fn test_validate_rejects_empty_destinations() {
        let mut settings = Settings::default();
        settings.backup.destination.disks.clear();
        assert!(settings.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StewardPaths::with_base_dir(temp_dir.path().to_path_buf());

        let settings = Settings::load_or_default(&paths).unwrap();
        assert_eq!(settings.backup.name, "backup-steward");
    }
}
