//! Backup health
//!
//! Every monitored destination gets a [`BackupDestinationStatus`]: the
//! reachability check followed by the configured checks, evaluated in order
//! until the first failure.

mod checks;
mod status;

pub use checks::{
    build_health_checks, HealthCheck, HealthCheckError, HealthCheckResult, IsReachable,
    MaximumAgeInDays, MaximumStorageInMegabytes,
};
pub use status::{
    partition_statuses, statuses_for_monitor_config, BackupDestinationStatus, HealthCheckFailure,
    StatusSummary,
};
