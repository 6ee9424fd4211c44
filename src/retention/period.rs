//! Retention windows
//!
//! Four contiguous windows reach progressively further into the past:
//!
//! ```text
//! now ── all ──┬── daily ──┬── weekly ──┬── monthly ──┬── yearly ──┐
//!        keep  │ 1 per day │ 1 per week │ 1 per month │ 1 per year │ delete
//! ```
//!
//! Each window ends where the next one starts.

use std::fmt;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use crate::config::RetentionSettings;

/// A time range; membership includes both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Period {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The more recent boundary
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// The older boundary
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether `date` lies between the boundaries, in either order
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        let (low, high) = if self.start <= self.end {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        low <= date && date <= high
    }
}

/// The four retention windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl PeriodKind {
    /// All windows, most recent first
    pub const ALL: [PeriodKind; 4] = [
        PeriodKind::Daily,
        PeriodKind::Weekly,
        PeriodKind::Monthly,
        PeriodKind::Yearly,
    ];

    /// Key that puts backups of the same day, week, month or year together
    ///
    /// Weekly keys pair the calendar year with the ISO week number.
    pub fn group_key(&self, date: DateTime<Utc>) -> String {
        let format = match self {
            PeriodKind::Daily => "%Y%m%d",
            PeriodKind::Weekly => "%Y%V",
            PeriodKind::Monthly => "%Y%m",
            PeriodKind::Yearly => "%Y",
        };
        date.format(format).to_string()
    }
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKind::Daily => write!(f, "daily"),
            PeriodKind::Weekly => write!(f, "weekly"),
            PeriodKind::Monthly => write!(f, "monthly"),
            PeriodKind::Yearly => write!(f, "yearly"),
        }
    }
}

/// Windows derived from the retention settings, anchored at a moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPeriods {
    pub daily: Period,
    pub weekly: Period,
    pub monthly: Period,
    pub yearly: Period,
}

impl RetentionPeriods {
    /// Calculate the windows as seen from `now`
    pub fn calculate(settings: &RetentionSettings, now: DateTime<Utc>) -> Self {
        let daily_start = sub_days(now, settings.keep_all_backups_for_days);
        let daily = Period::new(
            daily_start,
            sub_days(daily_start, settings.keep_daily_backups_for_days),
        );
        let weekly = Period::new(
            daily.end(),
            sub_days(daily.end(), settings.keep_weekly_backups_for_weeks * 7),
        );
        let monthly = Period::new(
            weekly.end(),
            sub_months(weekly.end(), settings.keep_monthly_backups_for_months),
        );
        let yearly = Period::new(
            monthly.end(),
            sub_months(monthly.end(), settings.keep_yearly_backups_for_years * 12),
        );

        Self {
            daily,
            weekly,
            monthly,
            yearly,
        }
    }

    /// The window of a kind
    pub fn get(&self, kind: PeriodKind) -> &Period {
        match kind {
            PeriodKind::Daily => &self.daily,
            PeriodKind::Weekly => &self.weekly,
            PeriodKind::Monthly => &self.monthly,
            PeriodKind::Yearly => &self.yearly,
        }
    }

    /// Anything older than this is outside every window
    pub fn cutoff(&self) -> DateTime<Utc> {
        self.yearly.end()
    }
}

fn sub_days(date: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    date.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Month arithmetic clamps to the end of shorter months (Mar 31 - 1 month = Feb 29).
fn sub_months(date: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
