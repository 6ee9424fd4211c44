//! Retention
//!
//! Decides which backups of a destination survive a cleanup pass. The
//! default strategy never deletes the newest backup, keeps one backup per
//! day, week, month and year inside the configured windows, drops anything
//! older, and finally removes the oldest backups until the destination fits
//! under its size ceiling.

mod period;
mod strategy;

pub use period::{Period, PeriodKind, RetentionPeriods};
pub use strategy::{
    group_by_key, CleanupReport, CleanupStrategy, DefaultStrategy, DeletedBackup, DeletionReason,
};
