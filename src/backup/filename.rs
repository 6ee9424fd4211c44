//! Backup file naming
//!
//! Archives are named `<prefix>YYYYMMDD-HHMMSS.zip`. The timestamp in the
//! name is the canonical backup date.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;

/// Extension of generated archives
pub const ARCHIVE_EXTENSION: &str = "zip";

/// Timestamp layout used in archive names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"([0-9]{8})-([0-9]{6})").expect("timestamp pattern is valid"))
}

/// Generate the archive name for a backup taken at `at`
pub fn archive_filename(prefix: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}{}.{}",
        prefix,
        at.format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    )
}

/// The last `/`-separated component of a disk path
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Recover the backup date from a path, if its name carries one
pub fn parse_filename_date(path: &str) -> Option<DateTime<Utc>> {
    let captures = timestamp_pattern().captures(basename(path))?;
    parse_backup_timestamp(captures.get(1)?.as_str(), captures.get(2)?.as_str())
}

/// Whether a path has the archive extension
pub fn has_archive_extension(path: &str) -> bool {
    basename(path)
        .rsplit_once('.')
        .map_or(false, |(_, ext)| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

fn parse_backup_timestamp(date_part: &str, time_part: &str) -> Option<DateTime<Utc>> {
    let year: i32 = date_part[0..4].parse().ok()?;
    let month: u32 = date_part[4..6].parse().ok()?;
    let day: u32 = date_part[6..8].parse().ok()?;
    let hour: u32 = time_part[0..2].parse().ok()?;
    let minute: u32 = time_part[2..4].parse().ok()?;
    let second: u32 = time_part[4..6].parse().ok()?;

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;

    Some(DateTime::from_naive_utc_and_offset(
        NaiveDateTime::new(date, time),
        Utc,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_archive_filename() {
        let at = Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap();
        assert_eq!(archive_filename("", at), "20251127-143022.zip");
        assert_eq!(archive_filename("nightly-", at), "nightly-20251127-143022.zip");
    }

    #[test]
    fn test_parse_filename_date() {
        let date = parse_filename_date("app/20251127-143022.zip").unwrap();
        assert_eq!(date.year(), 2025);
        assert_eq!(date.month(), 11);
        assert_eq!(date.day(), 27);
        assert_eq!(date.hour(), 14);
        assert_eq!(date.second(), 22);

        let prefixed = parse_filename_date("app/nightly-20251127-143022.zip").unwrap();
        assert_eq!(prefixed, date);
    }

    #[test]
    fn test_unparseable_names() {
        assert!(parse_filename_date("app/backup.zip").is_none());
        // Month 13 does not exist
        assert!(parse_filename_date("app/20251327-143022.zip").is_none());
        // The folder name is not considered
        assert!(parse_filename_date("20251127-143022/backup.zip").is_none());
    }

    #[test]
    fn test_non_ascii_digits_are_not_a_timestamp() {
        assert!(parse_filename_date("app/1٢٠٢٤٠١٠-120000.zip").is_none());
        assert!(parse_filename_date("app/٢٠٢٤٠١٠١-١٢٠٠٠٠.zip").is_none());
        assert!(parse_filename_date("app/20240101-12000٠.zip").is_none());
    }

    #[test]
    fn test_has_archive_extension() {
        assert!(has_archive_extension("app/20251127-143022.zip"));
        assert!(has_archive_extension("app/BACKUP.ZIP"));
        assert!(!has_archive_extension("app/notes.txt"));
        assert!(!has_archive_extension("app/zip"));
    }
}
