//! Display formatting for terminal output
//!
//! Tables for destinations and journal entries, plus the size and age
//! helpers they share.

pub mod events;
pub mod format;
pub mod status;

pub use events::format_event_table;
pub use format::{format_age, format_duration, format_size, format_timestamp};
pub use status::{format_failures, format_status_table, StatusRow};
