//! `events` command

use crate::display::format_event_table;
use crate::error::StewardResult;

use super::Runtime;

/// Show the most recent journal entries
pub fn handle_events_command(runtime: &Runtime, limit: usize) -> StewardResult<()> {
    let journal = runtime.journal();
    if !journal.exists() {
        println!("No events recorded yet.");
        return Ok(());
    }

    let entries = journal.read_recent(limit)?;
    let total = journal.entry_count()?;
    println!("{}", format_event_table(&entries));
    println!("Showing {} of {} event(s)", entries.len(), total);
    Ok(())
}
