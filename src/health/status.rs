//! Destination health status
//!
//! A status runs its checks in order, reachability first, and stops at the
//! first one that fails. One unhealthy destination never stops the others
//! from being evaluated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::checks::{build_health_checks, HealthCheck, HealthCheckError, IsReachable};
use crate::backup::BackupDestination;
use crate::config::MonitorSettings;
use crate::storage::DiskRegistry;

/// The check that failed and why
#[derive(Debug)]
pub struct HealthCheckFailure {
    check: &'static str,
    error: HealthCheckError,
}

impl HealthCheckFailure {
    pub fn new(check: &'static str, error: HealthCheckError) -> Self {
        Self { check, error }
    }

    /// Name of the failing check
    pub fn check(&self) -> &'static str {
        self.check
    }

    pub fn error(&self) -> &HealthCheckError {
        &self.error
    }

    /// Whether the failure came from something other than the checked condition
    pub fn was_unexpected(&self) -> bool {
        matches!(self.error, HealthCheckError::Unexpected(_))
    }

    /// Whether the destination could not be reached
    pub fn is_connectivity(&self) -> bool {
        match &self.error {
            HealthCheckError::Unreachable(_) => true,
            HealthCheckError::Unexpected(err) => err.is_connectivity(),
            HealthCheckError::Failed(_) => false,
        }
    }

    pub fn message(&self) -> String {
        self.error.message()
    }
}

/// Health of one destination
pub struct BackupDestinationStatus {
    destination: BackupDestination,
    checks: Vec<Box<dyn HealthCheck>>,
    failure: Option<HealthCheckFailure>,
    evaluated: bool,
}

impl BackupDestinationStatus {
    /// A status whose checks run after the reachability check
    pub fn new(destination: BackupDestination, checks: Vec<Box<dyn HealthCheck>>) -> Self {
        let mut all: Vec<Box<dyn HealthCheck>> = Vec::with_capacity(checks.len() + 1);
        all.push(Box::new(IsReachable));
        all.extend(checks);

        Self {
            destination,
            checks: all,
            failure: None,
            evaluated: false,
        }
    }

    /// Run the checks; later calls return the first verdict
    pub fn evaluate(&mut self) -> bool {
        if self.evaluated {
            return self.failure.is_none();
        }
        self.evaluated = true;

        for check in &self.checks {
            if let Err(error) = check.check(&mut self.destination) {
                warn!(
                    disk = %self.destination.disk_name(),
                    backup = %self.destination.backup_name(),
                    check = check.name(),
                    error = %error,
                    "Health check failed"
                );
                self.failure = Some(HealthCheckFailure::new(check.name(), error));
                return false;
            }
            debug!(
                disk = %self.destination.disk_name(),
                check = check.name(),
                "Health check passed"
            );
        }
        true
    }

    /// Healthy once evaluated without a failure
    pub fn is_healthy(&self) -> bool {
        self.evaluated && self.failure.is_none()
    }

    pub fn failure(&self) -> Option<&HealthCheckFailure> {
        self.failure.as_ref()
    }

    pub fn destination(&self) -> &BackupDestination {
        &self.destination
    }

    pub fn destination_mut(&mut self) -> &mut BackupDestination {
        &mut self.destination
    }

    /// Names of the checks, reachability first
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Key used to order statuses in reports
    pub fn sort_key(&self) -> String {
        format!(
            "{}-{}",
            self.destination.backup_name(),
            self.destination.disk_name()
        )
    }

    /// Serializable snapshot for events and output
    ///
    /// Storage usage is left out when it cannot be determined.
    pub fn summary(&mut self) -> StatusSummary {
        let healthy = self.is_healthy();
        let reachable = !self.failure.as_ref().is_some_and(|f| f.is_connectivity());

        let (backup_count, newest_backup, used_storage) = if reachable {
            let used = self.destination.used_storage().ok();
            let backups = self.destination.backups();
            (backups.len(), backups.newest().map(|b| b.date()), used)
        } else {
            (0, None, None)
        };

        StatusSummary {
            backup_name: self.destination.backup_name().to_string(),
            disk_name: self.destination.disk_name().to_string(),
            reachable,
            healthy,
            backup_count,
            newest_backup,
            used_storage,
            failed_check: self.failure.as_ref().map(|f| f.check().to_string()),
            failure_message: self.failure.as_ref().map(|f| f.message()),
            unexpected: self.failure.as_ref().is_some_and(|f| f.was_unexpected()),
        }
    }
}

/// Snapshot of a status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub backup_name: String,
    pub disk_name: String,
    pub reachable: bool,
    pub healthy: bool,
    pub backup_count: usize,
    pub newest_backup: Option<DateTime<Utc>>,
    pub used_storage: Option<u64>,
    pub failed_check: Option<String>,
    pub failure_message: Option<String>,
    pub unexpected: bool,
}

/// Evaluated statuses for every monitored destination, ordered by
/// `backup_name-disk_name`
pub fn statuses_for_monitor_config(
    monitors: &[MonitorSettings],
    registry: &DiskRegistry,
    now: Option<DateTime<Utc>>,
) -> Vec<BackupDestinationStatus> {
    let mut statuses: Vec<BackupDestinationStatus> = monitors
        .iter()
        .flat_map(|monitor| {
            monitor.disks.iter().map(move |disk| {
                let destination = BackupDestination::create(registry, disk, &monitor.name);
                let checks = build_health_checks(&monitor.health_checks, now);
                BackupDestinationStatus::new(destination, checks)
            })
        })
        .collect();

    for status in &mut statuses {
        status.evaluate();
    }

    statuses.sort_by_key(|status| status.sort_key());
    statuses
}

/// Split statuses into healthy and unhealthy, keeping their order
pub fn partition_statuses(
    statuses: Vec<BackupDestinationStatus>,
) -> (Vec<BackupDestinationStatus>, Vec<BackupDestinationStatus>) {
    statuses.into_iter().partition(|status| status.is_healthy())
}
