//! Journal listing

use tabled::builder::Builder;
use tabled::settings::Style;

use super::format::format_timestamp;
use crate::events::EventEntry;

/// Table of journal entries, oldest first
pub fn format_event_table(entries: &[EventEntry]) -> String {
    if entries.is_empty() {
        return "(no events recorded)".to_string();
    }

    let mut builder = Builder::new();
    builder.push_record(["Time", "Run", "Event", "Details"]);
    for entry in entries {
        builder.push_record([
            format_timestamp(entry.timestamp),
            entry.run_id.to_string(),
            entry.event.name().to_string(),
            entry.event.summary(),
        ]);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, RunId};

    #[test]
    fn test_event_table() {
        let run_id = RunId::new();
        let entries = vec![EventEntry::new(run_id, Event::ManifestCreated { file_count: 4 })];

        let table = format_event_table(&entries);
        assert!(table.contains("manifest_created"));
        assert!(table.contains(&run_id.to_string()));
        assert!(table.contains("4 file(s) selected"));
    }

    #[test]
    fn test_empty_journal() {
        assert_eq!(format_event_table(&[]), "(no events recorded)");
    }
}
