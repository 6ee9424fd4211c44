//! Health checks over a backup destination
//!
//! A check either passes or returns a [`HealthCheckError`]. Checks never
//! panic on a failing destination; storage errors are reported as
//! [`HealthCheckError::Unexpected`].

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::backup::BackupDestination;
use crate::config::HealthCheckConfig;
use crate::display::{format_size, format_timestamp};
use crate::error::StewardError;

/// Why a check did not pass
#[derive(Debug)]
pub enum HealthCheckError {
    /// The destination is in a state the check does not accept
    Failed(String),
    /// The destination could not be reached
    Unreachable(String),
    /// Something other than the checked condition went wrong
    Unexpected(StewardError),
}

impl HealthCheckError {
    pub fn message(&self) -> String {
        match self {
            HealthCheckError::Failed(message) | HealthCheckError::Unreachable(message) => {
                message.clone()
            }
            HealthCheckError::Unexpected(err) => err.to_string(),
        }
    }
}

impl fmt::Display for HealthCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl From<StewardError> for HealthCheckError {
    fn from(err: StewardError) -> Self {
        HealthCheckError::Unexpected(err)
    }
}

pub type HealthCheckResult = Result<(), HealthCheckError>;

/// A predicate over a destination
pub trait HealthCheck {
    /// Name shown in reports
    fn name(&self) -> &'static str;

    fn check(&self, destination: &mut BackupDestination) -> HealthCheckResult;
}

/// The destination can be listed
#[derive(Debug, Clone, Copy, Default)]
pub struct IsReachable;

impl HealthCheck for IsReachable {
    fn name(&self) -> &'static str {
        "IsReachable"
    }

    fn check(&self, destination: &mut BackupDestination) -> HealthCheckResult {
        if destination.is_reachable() {
            return Ok(());
        }
        Err(HealthCheckError::Unreachable(
            destination.connection_failure().to_string(),
        ))
    }
}

/// The newest backup is younger than a number of days
#[derive(Debug, Clone, Copy)]
pub struct MaximumAgeInDays {
    days: Option<u32>,
    now: Option<DateTime<Utc>>,
}

impl MaximumAgeInDays {
    /// `None` only requires that a backup exists
    pub fn new(days: Option<u32>) -> Self {
        Self { days, now: None }
    }

    /// Measure age against a fixed moment
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl HealthCheck for MaximumAgeInDays {
    fn name(&self) -> &'static str {
        "MaximumAgeInDays"
    }

    fn check(&self, destination: &mut BackupDestination) -> HealthCheckResult {
        if let Some(error) = enumeration_failure(destination) {
            return Err(error);
        }
        let Some(newest) = destination.newest_backup() else {
            return Err(HealthCheckError::Failed("There are no backups".to_string()));
        };

        let Some(days) = self.days else {
            return Ok(());
        };

        let now = self.now.unwrap_or_else(Utc::now);
        let threshold = now - Duration::days(i64::from(days));
        if newest.date() > threshold {
            return Ok(());
        }

        Err(HealthCheckError::Failed(format!(
            "The latest backup made on {} is considered too old",
            format_timestamp(newest.date())
        )))
    }
}

/// Backups use at most a number of megabytes
#[derive(Debug, Clone, Copy)]
pub struct MaximumStorageInMegabytes {
    megabytes: u64,
}

impl MaximumStorageInMegabytes {
    pub fn new(megabytes: u64) -> Self {
        Self { megabytes }
    }

    pub fn maximum_bytes(&self) -> u64 {
        self.megabytes.saturating_mul(1024 * 1024)
    }
}

impl HealthCheck for MaximumStorageInMegabytes {
    fn name(&self) -> &'static str {
        "MaximumStorageInMegabytes"
    }

    fn check(&self, destination: &mut BackupDestination) -> HealthCheckResult {
        if let Some(error) = enumeration_failure(destination) {
            return Err(error);
        }
        let used = destination.used_storage()?;
        if used <= self.maximum_bytes() {
            return Ok(());
        }

        Err(HealthCheckError::Failed(format!(
            "The backups are using too much storage ({}), the maximum is {}",
            format_size(used),
            format_size(self.maximum_bytes())
        )))
    }
}

/// The error that kept the destination's backups from being listed
fn enumeration_failure(destination: &mut BackupDestination) -> Option<HealthCheckError> {
    destination.backups();
    let error = match destination.connection_error()? {
        StewardError::Connectivity { .. } => destination.connection_failure(),
        StewardError::Storage(message) => StewardError::Storage(message.clone()),
        other => StewardError::Storage(other.to_string()),
    };
    Some(HealthCheckError::Unexpected(error))
}

/// Build the configured checks, in order
pub fn build_health_checks(
    configs: &[HealthCheckConfig],
    now: Option<DateTime<Utc>>,
) -> Vec<Box<dyn HealthCheck>> {
    configs
        .iter()
        .map(|config| -> Box<dyn HealthCheck> {
            match config {
                HealthCheckConfig::MaximumAgeInDays(days) => {
                    let check = MaximumAgeInDays::new(*days);
                    Box::new(match now {
                        Some(now) => check.at(now),
                        None => check,
                    })
                }
                HealthCheckConfig::MaximumStorageInMegabytes(megabytes) => {
                    Box::new(MaximumStorageInMegabytes::new(*megabytes))
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive_filename;
    use crate::storage::MemoryDisk;
    use chrono::TimeZone;
    use std::sync::Arc;

    const MB: u64 = 1024 * 1024;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn destination_with(ages: &[Duration], size: u64) -> (Arc<MemoryDisk>, BackupDestination) {
        let disk = Arc::new(MemoryDisk::new("memory"));
        for age in ages {
            let date = now() - *age;
            disk.put_sized(&format!("app/{}", archive_filename("", date)), size, date);
        }
        let destination = BackupDestination::new(Some(disk.clone()), "memory", "app");
        (disk, destination)
    }

    #[test]
    fn test_reachable() {
        let (_, mut destination) = destination_with(&[], 1);
        assert!(IsReachable.check(&mut destination).is_ok());
    }

    #[test]
    fn test_unreachable() {
        let (disk, mut destination) = destination_with(&[], 1);
        disk.set_unreachable(true);

        let err = IsReachable.check(&mut destination).unwrap_err();
        assert!(matches!(err, HealthCheckError::Unreachable(_)));
        assert!(err.message().contains("memory"));
    }

    #[test]
    fn test_too_old_backup_fails() {
        let (_, mut destination) = destination_with(&[Duration::hours(25)], 1);
        let check = MaximumAgeInDays::new(Some(1)).at(now());

        let err = check.check(&mut destination).unwrap_err();
        assert!(matches!(err, HealthCheckError::Failed(_)));
        assert!(err.message().contains("too old"));
    }

    #[test]
    fn test_recent_backup_passes() {
        let (_, mut destination) = destination_with(&[Duration::hours(23)], 1);
        let check = MaximumAgeInDays::new(Some(1)).at(now());
        assert!(check.check(&mut destination).is_ok());
    }

    #[test]
    fn test_no_backups_fails_even_without_age() {
        let (_, mut destination) = destination_with(&[], 1);
        let err = MaximumAgeInDays::new(None)
            .at(now())
            .check(&mut destination)
            .unwrap_err();
        assert_eq!(err.message(), "There are no backups");
    }

    #[test]
    fn test_disabled_age_passes_with_old_backup() {
        let (_, mut destination) = destination_with(&[Duration::days(400)], 1);
        assert!(MaximumAgeInDays::new(None)
            .at(now())
            .check(&mut destination)
            .is_ok());
    }

    #[test]
    fn test_storage_limit() {
        let (_, mut destination) = destination_with(&[Duration::hours(1), Duration::hours(2)], MB);

        assert!(MaximumStorageInMegabytes::new(2)
            .check(&mut destination)
            .is_ok());

        let err = MaximumStorageInMegabytes::new(1)
            .check(&mut destination)
            .unwrap_err();
        assert!(err.message().contains("2.0 MB"));
    }

    #[test]
    fn test_huge_storage_limit_saturates() {
        assert_eq!(
            MaximumStorageInMegabytes::new(u64::MAX / 1024).maximum_bytes(),
            u64::MAX
        );

        let (_, mut destination) = destination_with(&[Duration::hours(1)], MB);
        assert!(MaximumStorageInMegabytes::new(u64::MAX)
            .check(&mut destination)
            .is_ok());
    }

    #[test]
    fn test_failed_stat_is_unexpected_not_missing_backups() {
        let (disk, mut destination) = destination_with(&[], 1);
        disk.put_sized("app/manual.zip", MB, now());
        disk.set_fail_stats(true);

        let err = MaximumAgeInDays::new(Some(1))
            .at(now())
            .check(&mut destination)
            .unwrap_err();
        match &err {
            HealthCheckError::Unexpected(inner) => assert!(!inner.is_connectivity()),
            other => panic!("expected an unexpected failure, got {:?}", other),
        }
        assert!(err.message().contains("manual.zip"));
        assert!(!err.message().contains("There are no backups"));

        let err = MaximumStorageInMegabytes::new(10)
            .check(&mut destination)
            .unwrap_err();
        assert!(matches!(err, HealthCheckError::Unexpected(_)));
    }

    #[test]
    fn test_failed_size_is_unexpected() {
        let (disk, mut destination) = destination_with(&[Duration::hours(1)], MB);
        disk.set_fail_stats(true);

        let err = MaximumStorageInMegabytes::new(10)
            .check(&mut destination)
            .unwrap_err();
        assert!(matches!(err, HealthCheckError::Unexpected(_)));
    }

    #[test]
    fn test_build_health_checks_keeps_order() {
        let checks = build_health_checks(
            &[
                HealthCheckConfig::MaximumStorageInMegabytes(10),
                HealthCheckConfig::MaximumAgeInDays(Some(1)),
            ],
            None,
        );
        let names: Vec<_> = checks.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["MaximumStorageInMegabytes", "MaximumAgeInDays"]);
    }
}
