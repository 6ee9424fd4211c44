//! Destination status tables

use chrono::{DateTime, Utc};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::format::{format_age, format_size};
use crate::health::StatusSummary;

/// One row of the destination table
#[derive(Tabled)]
pub struct StatusRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Disk")]
    pub disk: String,
    #[tabled(rename = "Reachable")]
    pub reachable: String,
    #[tabled(rename = "Healthy")]
    pub healthy: String,
    #[tabled(rename = "Backups")]
    pub count: String,
    #[tabled(rename = "Newest")]
    pub newest: String,
    #[tabled(rename = "Used storage")]
    pub used_storage: String,
}

impl StatusRow {
    pub fn from_summary(summary: &StatusSummary, now: DateTime<Utc>) -> Self {
        Self {
            name: summary.backup_name.clone(),
            disk: summary.disk_name.clone(),
            reachable: yes_no(summary.reachable),
            healthy: yes_no(summary.healthy),
            count: if summary.reachable {
                summary.backup_count.to_string()
            } else {
                "/".to_string()
            },
            newest: summary
                .newest_backup
                .map(|date| format_age(date, now))
                .unwrap_or_else(|| "No backups present".to_string()),
            used_storage: summary
                .used_storage
                .map(format_size)
                .unwrap_or_else(|| "/".to_string()),
        }
    }
}

fn yes_no(value: bool) -> String {
    if value { "✅" } else { "❌" }.to_string()
}

/// Table of destinations, healthy ones first
pub fn format_status_table(summaries: &[StatusSummary], now: DateTime<Utc>) -> String {
    if summaries.is_empty() {
        return "(no monitored destinations)".to_string();
    }

    let mut sorted: Vec<&StatusSummary> = summaries.iter().collect();
    sorted.sort_by_key(|s| !s.healthy);

    let rows: Vec<StatusRow> = sorted
        .into_iter()
        .map(|s| StatusRow::from_summary(s, now))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Failure lines for unhealthy destinations
pub fn format_failures(summaries: &[StatusSummary]) -> Vec<String> {
    summaries
        .iter()
        .filter_map(|s| {
            let message = s.failure_message.as_deref()?;
            let check = s.failed_check.as_deref().unwrap_or("unknown");
            let kind = if s.unexpected { " (unexpected)" } else { "" };
            Some(format!(
                "{} on {}: {}{}: {}",
                s.backup_name, s.disk_name, check, kind, message
            ))
        })
        .collect()
}
