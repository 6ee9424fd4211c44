use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use steward::cli::{
    handle_backup_command, handle_cleanup_command, handle_config_command, handle_events_command,
    handle_init_command, handle_list_command, handle_monitor_command, BackupArgs, Runtime,
};
use steward::config::StewardPaths;

/// Environment variable holding the log filter
const LOG_ENV_VAR: &str = "STEWARD_LOG";

#[derive(Parser)]
#[command(
    name = "steward",
    author = "Kaylee Beyene",
    version,
    about = "Create, retire and monitor backup archives",
    long_about = "backup-steward archives files and database dumps, copies the archive \
                  to every configured disk, thins old backups with a \
                  grandfather-father-son retention policy and checks that every \
                  destination stays healthy."
)]
struct Cli {
    /// Settings file to use instead of the default location
    #[arg(short, long, global = true, env = "STEWARD_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default settings file
    Init {
        /// Overwrite an existing settings file
        #[arg(short, long)]
        force: bool,
    },

    /// Show current configuration and paths
    Config,

    /// Create a backup and copy it to every destination
    Backup(BackupArgs),

    /// Delete old backups according to the retention policy
    Cleanup,

    /// Check the health of every monitored destination
    Monitor,

    /// List destinations and their backups
    List,

    /// Show recorded events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = StewardPaths::new()?;

    let load = || Runtime::load(paths.clone(), cli.config.clone());

    match cli.command {
        Some(Commands::Init { force }) => handle_init_command(&paths, force)?,
        Some(Commands::Config) => handle_config_command(&load()?)?,
        Some(Commands::Backup(args)) => handle_backup_command(&load()?, args)?,
        Some(Commands::Cleanup) => handle_cleanup_command(&load()?)?,
        Some(Commands::Monitor) => handle_monitor_command(&load()?)?,
        Some(Commands::List) => handle_list_command(&load()?)?,
        Some(Commands::Events { limit }) => handle_events_command(&load()?, limit)?,
        None => {
            println!("backup-steward - backup lifecycle manager");
            println!();
            println!("Run 'steward --help' for usage information.");
            println!("Run 'steward init' to write a settings file.");
        }
    }

    Ok(())
}
