//! The monitor action
//!
//! Evaluates the health checks of every monitored destination. A run
//! succeeds even when destinations are unhealthy; callers look at the
//! passable to decide what that means for them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::MonitorSettings;
use crate::error::StewardResult;
use crate::events::Event;
use crate::health::{partition_statuses, statuses_for_monitor_config, StatusSummary};
use crate::pipeline::{Action, Next, Passable, Pipeline, RunContext, Task};
use crate::storage::DiskRegistry;

/// Healthy and unhealthy destinations of one monitor run
#[derive(Debug, Default, Serialize)]
pub struct MonitorPassable {
    pub healthy: Vec<StatusSummary>,
    pub unhealthy: Vec<StatusSummary>,
}

impl MonitorPassable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_healthy(&self) -> bool {
        self.unhealthy.is_empty()
    }
}

impl Passable for MonitorPassable {}

/// Checks the health of every monitored destination
pub struct MonitorAction {
    monitors: Vec<MonitorSettings>,
    registry: Arc<DiskRegistry>,
    now: Option<DateTime<Utc>>,
}

impl MonitorAction {
    pub fn new(monitors: Vec<MonitorSettings>, registry: Arc<DiskRegistry>) -> Self {
        Self {
            monitors,
            registry,
            now: None,
        }
    }

    /// Judge backup ages against a fixed moment
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }
}

impl Action for MonitorAction {
    type Passable = MonitorPassable;

    fn name(&self) -> &'static str {
        "monitor"
    }

    fn pipeline(&self) -> Pipeline<MonitorPassable> {
        Pipeline::new().through(CheckHealth {
            monitors: self.monitors.clone(),
            registry: Arc::clone(&self.registry),
            now: self.now,
        })
    }
}

pub struct CheckHealth {
    monitors: Vec<MonitorSettings>,
    registry: Arc<DiskRegistry>,
    now: Option<DateTime<Utc>>,
}

impl Task<MonitorPassable> for CheckHealth {
    fn name(&self) -> &'static str {
        "check_health"
    }

    fn handle(
        &self,
        passable: &mut MonitorPassable,
        ctx: &RunContext<'_>,
        next: Next<'_, MonitorPassable>,
    ) -> StewardResult<()> {
        let statuses = statuses_for_monitor_config(&self.monitors, &self.registry, self.now);
        let (mut healthy, mut unhealthy) = partition_statuses(statuses);

        passable.healthy = healthy.iter_mut().map(|s| s.summary()).collect();
        passable.unhealthy = unhealthy.iter_mut().map(|s| s.summary()).collect();

        if !passable.healthy.is_empty() {
            ctx.emit(Event::HealthyDestinationsFound {
                statuses: passable.healthy.clone(),
            });
        }
        if !passable.unhealthy.is_empty() {
            ctx.emit(Event::UnhealthyDestinationsFound {
                statuses: passable.unhealthy.clone(),
            });
        }

        next.run(passable, ctx)
    }
}
