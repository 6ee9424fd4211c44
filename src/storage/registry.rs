//! Disk registry
//!
//! Resolves disk names from the settings into live drivers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{Disk, LocalDisk, MemoryDisk};
use crate::config::{DiskConfig, DiskDriver, Settings, WriteOptions};
use crate::error::{StewardError, StewardResult};

struct RegisteredDisk {
    disk: Arc<dyn Disk>,
    write_options: WriteOptions,
}

/// All disks known to one run
#[derive(Default)]
pub struct DiskRegistry {
    disks: BTreeMap<String, RegisteredDisk>,
    /// Disks that are configured but could not be built, with the reason
    broken: BTreeMap<String, String>,
}

impl DiskRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build drivers for every disk in the settings
    pub fn from_settings(settings: &Settings) -> Self {
        let mut registry = Self::new();
        for (name, config) in &settings.disks {
            match build_disk(name, config) {
                Ok(disk) => registry.register_with_options(name, disk, config.write_options.clone()),
                Err(reason) => {
                    debug!(disk = %name, %reason, "disk could not be built");
                    registry.broken.insert(name.clone(), reason);
                }
            }
        }
        registry
    }

    /// Register a disk under a name, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, disk: Arc<dyn Disk>) {
        self.register_with_options(name, disk, WriteOptions::default());
    }

    /// Register a disk with write options
    pub fn register_with_options(
        &mut self,
        name: impl Into<String>,
        disk: Arc<dyn Disk>,
        write_options: WriteOptions,
    ) {
        let name = name.into();
        self.broken.remove(&name);
        self.disks.insert(
            name,
            RegisteredDisk {
                disk,
                write_options,
            },
        );
    }

    /// Look up a disk by name
    ///
    /// Unknown or misconfigured disks resolve to a connectivity error.
    pub fn resolve(&self, name: &str) -> StewardResult<Arc<dyn Disk>> {
        if let Some(registered) = self.disks.get(name) {
            return Ok(Arc::clone(&registered.disk));
        }

        let reason = self
            .broken
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("disk [{}] does not have a configured driver", name));
        Err(StewardError::connectivity(name, reason))
    }

    /// Write options for a disk, defaults when unknown
    pub fn write_options(&self, name: &str) -> WriteOptions {
        self.disks
            .get(name)
            .map(|r| r.write_options.clone())
            .unwrap_or_default()
    }

    /// Names of all usable disks
    pub fn names(&self) -> Vec<&str> {
        self.disks.keys().map(String::as_str).collect()
    }
}

fn build_disk(name: &str, config: &DiskConfig) -> Result<Arc<dyn Disk>, String> {
    match config.driver {
        DiskDriver::Local => {
            let root = config
                .root
                .clone()
                .ok_or_else(|| "the local driver needs a root directory".to_string())?;
            Ok(Arc::new(LocalDisk::new(name, root)))
        }
        DiskDriver::Memory => Ok(Arc::new(MemoryDisk::new(name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings_with(disks: Vec<(&str, DiskConfig)>) -> Settings {
        let mut settings = Settings::default();
        settings.disks = disks
            .into_iter()
            .map(|(name, config)| (name.to_string(), config))
            .collect();
        settings
    }

    #[test]
    fn test_resolves_configured_disks() {
        let settings = settings_with(vec![
            (
                "local",
                DiskConfig {
                    driver: DiskDriver::Local,
                    root: Some(PathBuf::from("/srv/backups")),
                    write_options: WriteOptions::default(),
                },
            ),
            (
                "scratch",
                DiskConfig {
                    driver: DiskDriver::Memory,
                    root: None,
                    write_options: WriteOptions::default(),
                },
            ),
        ]);

        let registry = DiskRegistry::from_settings(&settings);
        assert!(registry.resolve("local").is_ok());
        assert!(registry.resolve("scratch").is_ok());
        assert_eq!(registry.names(), vec!["local", "scratch"]);
    }

    #[test]
    fn test_unknown_disk_is_connectivity_error() {
        let registry = DiskRegistry::new();
        let err = registry.resolve("s3").err().unwrap();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("does not have a configured driver"));
    }

    #[test]
    fn test_local_without_root_is_broken() {
        let settings = settings_with(vec![(
            "local",
            DiskConfig {
                driver: DiskDriver::Local,
                root: None,
                write_options: WriteOptions::default(),
            },
        )]);

        let registry = DiskRegistry::from_settings(&settings);
        let err = registry.resolve("local").err().unwrap();
        assert!(err.to_string().contains("root directory"));
    }
}
