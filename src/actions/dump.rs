//! Database dumps
//!
//! A dump is whatever the configured command writes to stdout. The command
//! line itself is configuration; nothing here knows about particular
//! database tools.

use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use tracing::info;

use crate::config::DatabaseSource;
use crate::error::{StewardError, StewardResult};

/// Produces a dump file for a database
pub trait DatabaseDumper {
    fn dump(&self, source: &DatabaseSource, target: &Path) -> StewardResult<()>;
}

/// Runs the configured command and stores its stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandDumper;

impl DatabaseDumper for CommandDumper {
    fn dump(&self, source: &DatabaseSource, target: &Path) -> StewardResult<()> {
        let (program, args) = source.command.split_first().ok_or_else(|| {
            StewardError::Config(format!("Database `{}` has no dump command", source.name))
        })?;

        let output = File::create(target).map_err(|e| {
            StewardError::Dump(format!("Failed to create {}: {}", target.display(), e))
        })?;

        let result = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(output))
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                StewardError::Dump(format!(
                    "Failed to run `{}` for {}: {}",
                    program, source.name, e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(StewardError::Dump(format!(
                "Dump of {} exited with {}: {}",
                source.name,
                result.status,
                stderr.trim()
            )));
        }

        info!(database = %source.name, path = %target.display(), "Dumped database");
        Ok(())
    }
}

/// File name of a dump inside the dump directory
pub fn dump_filename(source: &DatabaseSource) -> String {
    format!("{}.{}", source.name, source.extension.trim_start_matches('.'))
}
