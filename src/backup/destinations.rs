//! All destinations of the configured backup

use super::destination::BackupDestination;
use crate::config::Settings;
use crate::error::{StewardError, StewardResult};
use crate::storage::DiskRegistry;

/// The destinations one backup is written to
#[derive(Debug, Default)]
pub struct BackupDestinationCollection {
    destinations: Vec<BackupDestination>,
}

impl BackupDestinationCollection {
    pub fn new(destinations: Vec<BackupDestination>) -> Self {
        Self { destinations }
    }

    /// One destination per disk named in `backup.destination.disks`
    pub fn from_settings(settings: &Settings, registry: &DiskRegistry) -> Self {
        Self::for_disks(
            registry,
            &settings.backup.name,
            &settings.backup.destination.disks,
        )
    }

    /// One destination per disk name for a backup name
    pub fn for_disks(registry: &DiskRegistry, backup_name: &str, disks: &[String]) -> Self {
        Self::new(
            disks
                .iter()
                .map(|disk| BackupDestination::create(registry, disk, backup_name))
                .collect(),
        )
    }

    /// Keep only the destination on `disk_name`
    pub fn only_disk(self, disk_name: &str) -> StewardResult<Self> {
        let destinations: Vec<_> = self
            .destinations
            .into_iter()
            .filter(|d| d.disk_name() == disk_name)
            .collect();

        if destinations.is_empty() {
            return Err(StewardError::Config(format!(
                "Disk `{}` is not configured as a backup destination",
                disk_name
            )));
        }

        Ok(Self::new(destinations))
    }

    pub fn len(&self) -> usize {
        self.destinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.destinations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BackupDestination> {
        self.destinations.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, BackupDestination> {
        self.destinations.iter_mut()
    }

    /// Names of the disks, in configured order
    pub fn disk_names(&self) -> Vec<String> {
        self.destinations
            .iter()
            .map(|d| d.disk_name().to_string())
            .collect()
    }
}

impl IntoIterator for BackupDestinationCollection {
    type Item = BackupDestination;
    type IntoIter = std::vec::IntoIter<BackupDestination>;

    fn into_iter(self) -> Self::IntoIter {
        self.destinations.into_iter()
    }
}
