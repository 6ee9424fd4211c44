//! `backup` command

use clap::Args;

use crate::actions::{BackupAction, BackupOptions, BackupPassable};
use crate::display::format_size;
use crate::error::StewardResult;
use crate::pipeline::Action;

use super::Runtime;

/// Options of the backup command
#[derive(Args, Debug, Default)]
pub struct BackupArgs {
    /// Only back up files, skip database dumps
    #[arg(long)]
    pub only_files: bool,

    /// Only back up databases, skip files
    #[arg(long)]
    pub only_db: bool,

    /// Only copy the backup to this disk
    #[arg(long, value_name = "DISK")]
    pub only_to_disk: Option<String>,

    /// Archive filename instead of the generated timestamp
    #[arg(long, value_name = "NAME")]
    pub filename: Option<String>,
}

impl From<BackupArgs> for BackupOptions {
    fn from(args: BackupArgs) -> Self {
        Self {
            only_files: args.only_files,
            only_db: args.only_db,
            only_to_disk: args.only_to_disk,
            filename: args.filename,
        }
    }
}

/// Create a backup and copy it to the destinations
pub fn handle_backup_command(runtime: &Runtime, args: BackupArgs) -> StewardResult<()> {
    let action = BackupAction::new(
        runtime.settings.clone(),
        runtime.registry(),
        runtime.temporary_base(),
    );
    let events = runtime.dispatcher();
    let mut passable = BackupPassable::new(args.into());

    println!("Creating backup...");
    action.execute(&mut passable, &events)?;

    let archive = passable.archive_filename.as_deref().unwrap_or("archive");
    let size = passable.archive_size.unwrap_or_default();
    println!(
        "Backup created: {} ({} file(s), {})",
        archive,
        passable.manifest.len(),
        format_size(size)
    );
    for copied in &passable.copied {
        println!("  Copied to {}: {}", copied.disk, copied.path);
    }
    Ok(())
}
