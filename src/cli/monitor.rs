//! `monitor` and `list` commands

use chrono::Utc;

use crate::actions::{MonitorAction, MonitorPassable};
use crate::config::MonitorSettings;
use crate::display::{format_failures, format_status_table};
use crate::error::{StewardError, StewardResult};
use crate::health::{statuses_for_monitor_config, StatusSummary};
use crate::pipeline::Action;

use super::Runtime;

/// Run the health checks; unhealthy destinations make the command fail
pub fn handle_monitor_command(runtime: &Runtime) -> StewardResult<()> {
    let action = MonitorAction::new(runtime.settings.monitor_backups.clone(), runtime.registry());
    let events = runtime.dispatcher();
    let mut passable = MonitorPassable::new();

    action.execute(&mut passable, &events)?;

    let all: Vec<StatusSummary> = passable
        .healthy
        .iter()
        .chain(passable.unhealthy.iter())
        .cloned()
        .collect();
    println!("{}", format_status_table(&all, Utc::now()));

    if passable.is_healthy() {
        println!("All backup destinations are healthy.");
        return Ok(());
    }

    println!();
    for line in format_failures(&passable.unhealthy) {
        println!("  {}", line);
    }
    Err(StewardError::Unhealthy {
        count: passable.unhealthy.len(),
    })
}

/// Show every destination with its backups, without recording events
pub fn handle_list_command(runtime: &Runtime) -> StewardResult<()> {
    let monitors = listed_destinations(runtime);
    let mut statuses = statuses_for_monitor_config(&monitors, &runtime.registry(), None);
    let summaries: Vec<StatusSummary> = statuses.iter_mut().map(|s| s.summary()).collect();

    println!("{}", format_status_table(&summaries, Utc::now()));
    Ok(())
}

// Without monitor entries the backup's own destinations are listed.
fn listed_destinations(runtime: &Runtime) -> Vec<MonitorSettings> {
    if !runtime.settings.monitor_backups.is_empty() {
        return runtime.settings.monitor_backups.clone();
    }

    let backup = &runtime.settings.backup;
    vec![MonitorSettings {
        name: backup.name.clone(),
        disks: backup.destination.disks.clone(),
        health_checks: Vec::new(),
    }]
}
