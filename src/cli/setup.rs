//! `init` and `config` commands

use crate::config::{DiskDriver, Settings, StewardPaths};
use crate::error::{StewardError, StewardResult};

use super::{anchor_local_roots, Runtime};

/// Write the default settings to the config file
pub fn handle_init_command(paths: &StewardPaths, force: bool) -> StewardResult<()> {
    let config_file = paths.config_file();
    if config_file.exists() && !force {
        return Err(StewardError::Config(format!(
            "{} already exists, use --force to overwrite it",
            config_file.display()
        )));
    }

    paths.ensure_directories()?;
    let mut settings = Settings::default();
    settings.save(&config_file)?;

    println!("Initialized backup-steward at: {}", paths.base_dir().display());
    println!("Settings written to: {}", config_file.display());

    // A missing local root reads as an unmounted drive, so create them now.
    anchor_local_roots(&mut settings, paths.base_dir());
    for (name, disk) in &settings.disks {
        if let (DiskDriver::Local, Some(root)) = (disk.driver, &disk.root) {
            std::fs::create_dir_all(root).map_err(|e| {
                StewardError::Io(format!("Failed to create root of disk {}: {}", name, e))
            })?;
            println!("Disk '{}' stores backups in: {}", name, root.display());
        }
    }
    println!();
    println!("Edit backup.source.include to choose what gets backed up,");
    println!("then run 'steward backup'.");
    Ok(())
}

/// Show paths and the effective settings
pub fn handle_config_command(runtime: &Runtime) -> StewardResult<()> {
    let settings = serde_yaml::to_string(&runtime.settings)?;

    println!("backup-steward configuration");
    println!("============================");
    println!("Base directory:  {}", runtime.paths.base_dir().display());
    println!(
        "Config file:     {}{}",
        runtime.config_file.display(),
        if runtime.config_file.exists() {
            ""
        } else {
            " (not written, using defaults)"
        }
    );
    println!(
        "Event journal:   {}",
        runtime.settings.journal_path(&runtime.paths).display()
    );
    println!("Temporary files: {}", runtime.temporary_base().display());
    println!();
    println!("Settings:");
    print!("{}", settings);
    Ok(())
}
