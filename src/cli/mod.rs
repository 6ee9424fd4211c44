//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the actions.

pub mod backup;
pub mod cleanup;
pub mod events;
pub mod monitor;
pub mod setup;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DiskDriver, Settings, StewardPaths};
use crate::error::{StewardError, StewardResult};
use crate::events::{EventDispatcher, EventJournal, JournalListener, TracingListener};
use crate::storage::DiskRegistry;

pub use backup::{handle_backup_command, BackupArgs};
pub use cleanup::handle_cleanup_command;
pub use events::handle_events_command;
pub use monitor::{handle_list_command, handle_monitor_command};
pub use setup::{handle_config_command, handle_init_command};

/// Paths and settings shared by every command
pub struct Runtime {
    pub paths: StewardPaths,
    pub settings: Settings,
    pub config_file: PathBuf,
}

impl Runtime {
    /// Resolve paths and load settings, from `config` when given
    pub fn load(paths: StewardPaths, config: Option<PathBuf>) -> StewardResult<Self> {
        let (config_file, mut settings) = match config {
            Some(path) => {
                if !path.exists() {
                    return Err(StewardError::not_found(
                        "Settings file",
                        path.display().to_string(),
                    ));
                }
                let settings = Settings::load(&path)?;
                (path, settings)
            }
            None => (paths.config_file(), Settings::load_or_default(&paths)?),
        };

        let base = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| paths.base_dir().clone());
        anchor_local_roots(&mut settings, &base);

        Ok(Self {
            paths,
            settings,
            config_file,
        })
    }

    pub fn registry(&self) -> Arc<DiskRegistry> {
        Arc::new(DiskRegistry::from_settings(&self.settings))
    }

    /// Log every event and append it to the journal
    pub fn dispatcher(&self) -> EventDispatcher {
        let journal = EventJournal::new(self.settings.journal_path(&self.paths));
        EventDispatcher::new()
            .with_listener(TracingListener)
            .with_listener(JournalListener::new(journal))
    }

    pub fn journal(&self) -> EventJournal {
        EventJournal::new(self.settings.journal_path(&self.paths))
    }

    /// Base directory for per-run staging directories
    pub fn temporary_base(&self) -> PathBuf {
        self.settings
            .backup
            .temporary_directory
            .clone()
            .unwrap_or_else(|| self.paths.temp_dir())
    }
}

// Relative local roots are relative to the config file, not the working directory.
pub(crate) fn anchor_local_roots(settings: &mut Settings, base: &Path) {
    for disk in settings.disks.values_mut() {
        if disk.driver != DiskDriver::Local {
            continue;
        }
        if let Some(root) = disk.root.as_mut() {
            if root.is_relative() {
                *root = base.join(&*root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_relative_roots_follow_the_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StewardPaths::with_base_dir(temp_dir.path().to_path_buf());

        let runtime = Runtime::load(paths, None).unwrap();
        assert_eq!(
            runtime.settings.disks["local"].root.as_deref(),
            Some(temp_dir.path().join("backups").as_path())
        );
        assert_eq!(runtime.temporary_base(), temp_dir.path().join("tmp"));
    }

    #[test]
    fn test_explicit_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_dir.path().join("custom").join("steward.json");
        let mut settings = Settings::default();
        settings.backup.name = "from-json".into();
        settings.save(&config).unwrap();

        let paths = StewardPaths::with_base_dir(temp_dir.path().join("base"));
        let runtime = Runtime::load(paths, Some(config.clone())).unwrap();
        assert_eq!(runtime.settings.backup.name, "from-json");
        assert_eq!(runtime.config_file, config);
        assert_eq!(
            runtime.settings.disks["local"].root.as_deref(),
            Some(temp_dir.path().join("custom").join("backups").as_path())
        );
    }

    #[test]
    fn test_missing_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = StewardPaths::with_base_dir(temp_dir.path().to_path_buf());

        let result = Runtime::load(paths, Some(temp_dir.path().join("nope.yaml")));
        assert!(result.err().is_some_and(|e| e.is_not_found()));
    }
}
