//! Cleanup strategies
//!
//! A strategy receives the backups of one destination, newest first, and
//! deletes the ones that should not survive. Deletions go straight to the
//! disk; an error aborts the pass and leaves whatever was already deleted
//! deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::period::{PeriodKind, RetentionPeriods};
use crate::backup::{total_size, Backup, BackupCollection};
use crate::config::RetentionSettings;
use crate::error::StewardResult;

/// Why a backup was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionReason {
    /// Another backup of the same group inside a window was newer
    Superseded(PeriodKind),
    /// Older than every retention window
    Expired,
    /// Removed to get under the size ceiling
    SizeLimit,
}

/// A backup removed by a cleanup pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedBackup {
    pub path: String,
    pub date: DateTime<Utc>,
    pub reason: DeletionReason,
}

/// What a cleanup pass did to one collection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// The newest backup, which is never deleted
    pub kept_newest: Option<String>,
    /// Deleted backups in deletion order
    pub deleted: Vec<DeletedBackup>,
}

impl CleanupReport {
    /// Paths of the deleted backups
    pub fn deleted_paths(&self) -> Vec<&str> {
        self.deleted.iter().map(|d| d.path.as_str()).collect()
    }
}

/// Decides which backups of a destination are deleted
pub trait CleanupStrategy {
    fn delete_old_backups(&self, backups: &BackupCollection) -> StewardResult<CleanupReport>;
}

/// Grandfather-father-son retention with a size ceiling
#[derive(Debug, Clone)]
pub struct DefaultStrategy {
    settings: RetentionSettings,
    now: Option<DateTime<Utc>>,
}

impl DefaultStrategy {
    pub fn new(settings: RetentionSettings) -> Self {
        Self {
            settings,
            now: None,
        }
    }

    /// Anchor the retention windows at a fixed moment instead of the clock
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn settings(&self) -> &RetentionSettings {
        &self.settings
    }

    /// Windows as seen from the strategy's notion of now
    pub fn periods(&self) -> RetentionPeriods {
        RetentionPeriods::calculate(&self.settings, self.now.unwrap_or_else(Utc::now))
    }

    fn thin_windows(
        &self,
        periods: &RetentionPeriods,
        backups: &[Backup],
        report: &mut CleanupReport,
    ) -> StewardResult<()> {
        for kind in PeriodKind::ALL {
            let period = periods.get(kind);
            let in_window: Vec<&Backup> = backups
                .iter()
                .filter(|b| period.contains(b.date()))
                .collect();

            for group in group_by_key(&in_window, |b| kind.group_key(b.date())).values() {
                for backup in group.iter().skip(1) {
                    delete(backup, DeletionReason::Superseded(kind), report)?;
                }
            }
        }
        Ok(())
    }

    fn remove_expired(
        &self,
        periods: &RetentionPeriods,
        backups: &[Backup],
        report: &mut CleanupReport,
    ) -> StewardResult<()> {
        let cutoff = periods.cutoff();
        for backup in backups.iter().filter(|b| b.date() < cutoff) {
            delete(backup, DeletionReason::Expired, report)?;
        }
        Ok(())
    }

    fn enforce_size_limit(
        &self,
        newest: &Backup,
        backups: &[Backup],
        report: &mut CleanupReport,
    ) -> StewardResult<()> {
        let maximum = self.settings.maximum_bytes();
        let newest_size = newest.size_in_bytes()?;

        loop {
            let survivors = existing(backups)?;
            let Some(oldest) = survivors.last() else {
                break;
            };
            if total_size(&survivors)? + newest_size <= maximum {
                break;
            }
            delete(oldest, DeletionReason::SizeLimit, report)?;
        }
        Ok(())
    }
}

impl CleanupStrategy for DefaultStrategy {
    fn delete_old_backups(&self, backups: &BackupCollection) -> StewardResult<CleanupReport> {
        let mut report = CleanupReport::default();

        let Some((newest, rest)) = backups.as_slice().split_first() else {
            return Ok(report);
        };
        report.kept_newest = Some(newest.path().to_string());

        let periods = self.periods();
        debug!(
            cutoff = %periods.cutoff(),
            candidates = rest.len(),
            "Applying retention windows"
        );

        self.thin_windows(&periods, rest, &mut report)?;
        self.remove_expired(&periods, rest, &mut report)?;
        self.enforce_size_limit(newest, rest, &mut report)?;

        Ok(report)
    }
}

/// Bucket backups by a key, keeping their order inside every bucket
pub fn group_by_key<'a, F>(backups: &[&'a Backup], key: F) -> BTreeMap<String, Vec<&'a Backup>>
where
    F: Fn(&Backup) -> String,
{
    let mut groups: BTreeMap<String, Vec<&'a Backup>> = BTreeMap::new();
    for backup in backups {
        groups.entry(key(*backup)).or_default().push(*backup);
    }
    groups
}

/// Backups that are still on their disk, in their original order
fn existing(backups: &[Backup]) -> StewardResult<Vec<&Backup>> {
    let mut result = Vec::new();
    for backup in backups {
        if backup.exists()? {
            result.push(backup);
        }
    }
    Ok(result)
}

fn delete(
    backup: &Backup,
    reason: DeletionReason,
    report: &mut CleanupReport,
) -> StewardResult<()> {
    if !backup.exists()? {
        return Ok(());
    }
    backup.delete()?;
    debug!(path = %backup.path(), reason = ?reason, "Retention removed backup");
    report.deleted.push(DeletedBackup {
        path: backup.path().to_string(),
        date: backup.date(),
        reason,
    });
    Ok(())
}
