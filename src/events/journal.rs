//! Append-only event journal
//!
//! Every event of every run is written as one JSON line and flushed
//! immediately, so the journal survives a crash mid-run.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{StewardError, StewardResult};

use super::event::EventEntry;

/// Reads and appends journal entries
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append an entry, creating the file and its directory when needed
    pub fn append(&self, entry: &EventEntry) -> StewardResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StewardError::Io(format!("Failed to create journal directory: {}", e))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StewardError::Io(format!("Failed to open event journal: {}", e)))?;

        let json = serde_json::to_string(entry)
            .map_err(|e| StewardError::Json(format!("Failed to serialize event: {}", e)))?;

        writeln!(file, "{}", json)
            .map_err(|e| StewardError::Io(format!("Failed to write event: {}", e)))?;

        file.flush()
            .map_err(|e| StewardError::Io(format!("Failed to flush event journal: {}", e)))?;

        Ok(())
    }

    /// All entries, oldest first
    pub fn read_all(&self) -> StewardResult<Vec<EventEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)
            .map_err(|e| StewardError::Io(format!("Failed to open event journal: {}", e)))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| {
                StewardError::Io(format!(
                    "Failed to read journal line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: EventEntry = serde_json::from_str(&line).map_err(|e| {
                StewardError::Json(format!(
                    "Failed to parse journal entry at line {}: {}",
                    line_num + 1,
                    e
                ))
            })?;

            entries.push(entry);
        }

        Ok(entries)
    }

    /// The last `count` entries, oldest first
    pub fn read_recent(&self, count: usize) -> StewardResult<Vec<EventEntry>> {
        let mut entries = self.read_all()?;
        let start = entries.len().saturating_sub(count);
        Ok(entries.split_off(start))
    }

    /// Number of non-empty lines in the journal
    pub fn entry_count(&self) -> StewardResult<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)
            .map_err(|e| StewardError::Io(format!("Failed to open event journal: {}", e)))?;

        let count = BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .filter(|line| !line.trim().is_empty())
            .count();

        Ok(count)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, RunId};
    use tempfile::TempDir;

    fn create_test_journal() -> (EventJournal, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let journal = EventJournal::new(temp_dir.path().join("logs").join("events.log"));
        (journal, temp_dir)
    }

    fn entry(file_count: usize) -> EventEntry {
        EventEntry::new(RunId::new(), Event::ManifestCreated { file_count })
    }

    #[test]
    fn test_append_and_read() {
        let (journal, _temp) = create_test_journal();
        journal.append(&entry(4)).unwrap();

        let entries = journal.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].event, Event::ManifestCreated { file_count: 4 });
    }

    #[test]
    fn test_read_recent() {
        let (journal, _temp) = create_test_journal();
        for i in 0..10 {
            journal.append(&entry(i)).unwrap();
        }

        let recent = journal.read_recent(3).unwrap();
        let counts: Vec<_> = recent
            .iter()
            .map(|e| match e.event {
                Event::ManifestCreated { file_count } => file_count,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(counts, vec![7, 8, 9]);
        assert_eq!(journal.entry_count().unwrap(), 10);
    }

    #[test]
    fn test_missing_journal_is_empty() {
        let (journal, _temp) = create_test_journal();
        assert!(!journal.exists());
        assert_eq!(journal.entry_count().unwrap(), 0);
        assert!(journal.read_all().unwrap().is_empty());
        assert!(journal.read_recent(5).unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let (journal, _temp) = create_test_journal();
        journal.append(&entry(1)).unwrap();
        let mut file = OpenOptions::new().append(true).open(journal.path()).unwrap();
        writeln!(file, "not json").unwrap();

        let err = journal.read_all().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_reopened_journal_keeps_entries() {
        let (journal, temp) = create_test_journal();
        journal.append(&entry(1)).unwrap();

        let reopened = EventJournal::new(temp.path().join("logs").join("events.log"));
        assert_eq!(reopened.read_all().unwrap().len(), 1);
    }
}
