//! The cleanup action
//!
//! Runs the retention strategy over every destination of the backup, one
//! destination after the other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::backup::BackupDestinationCollection;
use crate::config::Settings;
use crate::error::StewardResult;
use crate::events::Event;
use crate::pipeline::{Action, Next, Passable, Pipeline, RunContext, Task};
use crate::retention::{CleanupStrategy, DefaultStrategy};
use crate::storage::DiskRegistry;

/// Outcome of cleaning one destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanedDestination {
    pub disk: String,
    pub backup_name: String,
    pub deleted: Vec<String>,
    pub used_storage: u64,
}

/// State of one cleanup run
#[derive(Debug, Default, Serialize)]
pub struct CleanupPassable {
    #[serde(skip)]
    pub destinations: Option<BackupDestinationCollection>,
    pub cleaned: Vec<CleanedDestination>,
}

impl CleanupPassable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backups deleted across all destinations
    pub fn deleted_count(&self) -> usize {
        self.cleaned.iter().map(|c| c.deleted.len()).sum()
    }
}

impl Passable for CleanupPassable {}

/// Deletes old backups on every destination
pub struct CleanupAction {
    settings: Settings,
    registry: Arc<DiskRegistry>,
    now: Option<DateTime<Utc>>,
}

impl CleanupAction {
    pub fn new(settings: Settings, registry: Arc<DiskRegistry>) -> Self {
        Self {
            settings,
            registry,
            now: None,
        }
    }

    /// Anchor the retention windows at a fixed moment
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn strategy(&self) -> DefaultStrategy {
        let strategy = DefaultStrategy::new(self.settings.cleanup.default_strategy.clone());
        match self.now {
            Some(now) => strategy.at(now),
            None => strategy,
        }
    }
}

impl Action for CleanupAction {
    type Passable = CleanupPassable;

    fn name(&self) -> &'static str {
        "cleanup"
    }

    fn pipeline(&self) -> Pipeline<CleanupPassable> {
        Pipeline::new()
            .through(ResolveDestinations {
                registry: Arc::clone(&self.registry),
                backup_name: self.settings.backup.name.clone(),
                disks: self.settings.backup.destination.disks.clone(),
            })
            .through(CleanDestinations {
                strategy: Box::new(self.strategy()),
            })
    }
}

/// Builds one destination per configured disk
pub struct ResolveDestinations {
    registry: Arc<DiskRegistry>,
    backup_name: String,
    disks: Vec<String>,
}

impl Task<CleanupPassable> for ResolveDestinations {
    fn name(&self) -> &'static str {
        "resolve_destinations"
    }

    fn handle(
        &self,
        passable: &mut CleanupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, CleanupPassable>,
    ) -> StewardResult<()> {
        passable.destinations = Some(BackupDestinationCollection::for_disks(
            &self.registry,
            &self.backup_name,
            &self.disks,
        ));
        next.run(passable, ctx)
    }
}

/// Applies the strategy to each destination in turn
pub struct CleanDestinations {
    strategy: Box<dyn CleanupStrategy>,
}

impl Task<CleanupPassable> for CleanDestinations {
    fn name(&self) -> &'static str {
        "clean_destinations"
    }

    fn handle(
        &self,
        passable: &mut CleanupPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, CleanupPassable>,
    ) -> StewardResult<()> {
        let mut destinations = passable.destinations.take().unwrap_or_default();

        for destination in destinations.iter_mut() {
            if !destination.is_reachable() {
                return Err(destination.connection_failure());
            }

            let report = self.strategy.delete_old_backups(destination.backups())?;
            if destination.connection_error().is_some() {
                return Err(destination.connection_failure());
            }

            let used_storage = destination.fresh().used_storage()?;
            let deleted: Vec<String> = report
                .deleted_paths()
                .into_iter()
                .map(String::from)
                .collect();

            info!(
                disk = %destination.disk_name(),
                backup = %destination.backup_name(),
                deleted = deleted.len(),
                used_storage,
                "Cleaned destination"
            );
            ctx.emit(Event::DestinationCleaned {
                disk: destination.disk_name().to_string(),
                backup_name: destination.backup_name().to_string(),
                deleted: deleted.clone(),
                used_storage,
            });
            passable.cleaned.push(CleanedDestination {
                disk: destination.disk_name().to_string(),
                backup_name: destination.backup_name().to_string(),
                deleted,
                used_storage,
            });
        }

        passable.destinations = Some(destinations);
        next.run(passable, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive_filename;
    use crate::events::{EventDispatcher, RecordingListener};
    use crate::storage::MemoryDisk;
    use chrono::{Duration, TimeZone};
    use std::rc::Rc;

    const MB: u64 = 1024 * 1024;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn backup_path(days_ago: i64) -> String {
        format!("app/{}", archive_filename("", now() - Duration::days(days_ago)))
    }

    fn disk_with_four_backups(name: &str) -> Arc<MemoryDisk> {
        let disk = Arc::new(MemoryDisk::new(name));
        for days_ago in 1..=4 {
            disk.put_sized(&backup_path(days_ago), MB, now() - Duration::days(days_ago));
        }
        disk
    }

    fn settings(disks: &[&str]) -> Settings {
        let mut settings = Settings::default();
        settings.backup.name = "app".into();
        settings.backup.destination.disks = disks.iter().map(|d| d.to_string()).collect();
        settings
            .cleanup
            .default_strategy
            .delete_oldest_backups_when_using_more_megabytes_than = 2;
        settings
    }

    fn run(
        settings: Settings,
        registry: DiskRegistry,
    ) -> (StewardResult<()>, CleanupPassable, Vec<Event>) {
        let recorder = Rc::new(RecordingListener::default());
        let events = EventDispatcher::new().with_listener(recorder.clone());
        let mut passable = CleanupPassable::new();
        let result = CleanupAction::new(settings, Arc::new(registry))
            .at(now())
            .execute(&mut passable, &events)
            .map(|_| ());
        (result, passable, recorder.events())
    }

    #[test]
    fn test_cleans_every_destination() {
        let primary = disk_with_four_backups("primary");
        let offsite = disk_with_four_backups("offsite");
        let mut registry = DiskRegistry::new();
        registry.register("primary", primary.clone());
        registry.register("offsite", offsite.clone());

        let (result, passable, events) = run(settings(&["primary", "offsite"]), registry);
        result.unwrap();

        for disk in [&primary, &offsite] {
            assert_eq!(disk.file_count(), 2);
            assert_eq!(disk.deletions(), vec![backup_path(4), backup_path(3)]);
        }
        assert_eq!(passable.cleaned.len(), 2);
        assert_eq!(passable.deleted_count(), 4);
        assert_eq!(passable.cleaned[0].used_storage, 2 * MB);

        let names: Vec<&str> = events.iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["destination_cleaned", "destination_cleaned", "action_succeeded"]
        );
        match &events[0] {
            Event::DestinationCleaned { disk, deleted, .. } => {
                assert_eq!(disk, "primary");
                assert_eq!(deleted, &vec![backup_path(4), backup_path(3)]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_destination_aborts_the_run() {
        let primary = disk_with_four_backups("primary");
        let offsite = disk_with_four_backups("offsite");
        offsite.set_unreachable(true);
        let mut registry = DiskRegistry::new();
        registry.register("primary", primary.clone());
        registry.register("offsite", offsite.clone());

        let (result, passable, events) = run(settings(&["primary", "offsite"]), registry);

        assert!(result.unwrap_err().is_connectivity());
        assert_eq!(primary.file_count(), 2);
        assert!(offsite.deletions().is_empty());
        assert_eq!(passable.cleaned.len(), 1);
        assert_eq!(events.last().map(|e| e.name()), Some("action_failed"));
    }

    #[test]
    fn test_unknown_disk_is_a_connectivity_failure() {
        let (result, _, _) = run(settings(&["s3"]), DiskRegistry::new());
        assert!(result.unwrap_err().is_connectivity());
    }

    #[test]
    fn test_failed_delete_aborts_the_run() {
        let primary = disk_with_four_backups("primary");
        primary.set_fail_deletes(true);
        let mut registry = DiskRegistry::new();
        registry.register("primary", primary.clone());

        let (result, passable, _) = run(settings(&["primary"]), registry);

        assert!(result.is_err());
        assert_eq!(primary.file_count(), 4);
        assert!(passable.cleaned.is_empty());
    }
}
