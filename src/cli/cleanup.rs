//! `cleanup` command

use crate::actions::{CleanupAction, CleanupPassable};
use crate::display::format_size;
use crate::error::StewardResult;
use crate::pipeline::Action;

use super::Runtime;

/// Apply the retention strategy to every destination
pub fn handle_cleanup_command(runtime: &Runtime) -> StewardResult<()> {
    let action = CleanupAction::new(runtime.settings.clone(), runtime.registry());
    let events = runtime.dispatcher();
    let mut passable = CleanupPassable::new();

    println!("Cleaning up old backups...");
    action.execute(&mut passable, &events)?;

    for cleaned in &passable.cleaned {
        println!(
            "  {} on {}: {} deleted, {} in use",
            cleaned.backup_name,
            cleaned.disk,
            cleaned.deleted.len(),
            format_size(cleaned.used_storage)
        );
        for path in &cleaned.deleted {
            println!("    - {}", path);
        }
    }
    println!("Deleted {} backup(s).", passable.deleted_count());
    Ok(())
}
