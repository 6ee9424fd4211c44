//! Domain events
//!
//! Events describe what a run did. They carry plain data only; turning them
//! into messages is up to whoever listens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::RunId;
use crate::health::StatusSummary;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The list of files going into the archive is complete
    ManifestCreated { file_count: usize },

    /// The archive was written to the temporary directory
    ArchiveCreated { path: String, size: u64 },

    /// The archive was copied to a destination
    BackupCopied {
        disk: String,
        backup_name: String,
        path: String,
    },

    /// Retention ran on a destination
    DestinationCleaned {
        disk: String,
        backup_name: String,
        deleted: Vec<String>,
        used_storage: u64,
    },

    /// An action finished all its tasks
    ActionSucceeded {
        action: String,
        context: serde_json::Value,
    },

    /// An action stopped at a failing task
    ActionFailed {
        action: String,
        context: serde_json::Value,
        error: String,
    },

    /// Monitored destinations that passed every check
    HealthyDestinationsFound { statuses: Vec<StatusSummary> },

    /// Monitored destinations with a failing check
    UnhealthyDestinationsFound { statuses: Vec<StatusSummary> },
}

impl Event {
    /// Short name for logs and tables
    pub fn name(&self) -> &'static str {
        match self {
            Event::ManifestCreated { .. } => "manifest_created",
            Event::ArchiveCreated { .. } => "archive_created",
            Event::BackupCopied { .. } => "backup_copied",
            Event::DestinationCleaned { .. } => "destination_cleaned",
            Event::ActionSucceeded { .. } => "action_succeeded",
            Event::ActionFailed { .. } => "action_failed",
            Event::HealthyDestinationsFound { .. } => "healthy_destinations_found",
            Event::UnhealthyDestinationsFound { .. } => "unhealthy_destinations_found",
        }
    }

    /// One-line description
    pub fn summary(&self) -> String {
        match self {
            Event::ManifestCreated { file_count } => format!("{} file(s) selected", file_count),
            Event::ArchiveCreated { path, size } => format!("{} ({} bytes)", path, size),
            Event::BackupCopied { disk, path, .. } => format!("{} on {}", path, disk),
            Event::DestinationCleaned {
                disk,
                backup_name,
                deleted,
                ..
            } => format!(
                "{} on {}: {} backup(s) deleted",
                backup_name,
                disk,
                deleted.len()
            ),
            Event::ActionSucceeded { action, .. } => format!("{} succeeded", action),
            Event::ActionFailed { action, error, .. } => format!("{} failed: {}", action, error),
            Event::HealthyDestinationsFound { statuses } => {
                format!("{} healthy destination(s)", statuses.len())
            }
            Event::UnhealthyDestinationsFound { statuses } => {
                format!("{} unhealthy destination(s)", statuses.len())
            }
        }
    }

    /// Whether this is one of the two terminal events of a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::ActionSucceeded { .. } | Event::ActionFailed { .. }
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.summary())
    }
}

/// A journal line: an event with when and in which run it happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: RunId,
    pub event: Event,
}

impl EventEntry {
    pub fn new(run_id: RunId, event: Event) -> Self {
        Self {
            timestamp: Utc::now(),
            run_id,
            event,
        }
    }
}
