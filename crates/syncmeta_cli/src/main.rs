//! syncmeta CLI
//!
//! Command-line tools for workspaces carrying sync metadata.
//!
//! # Commands
//!
//! - `inspect` - Display the metadata recorded for one directory
//! - `verify` - Check every metadata record for malformed content
//! - `status` - List out-of-sync resources

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use syncmeta_core::Config;
use tracing_subscriber::EnvFilter;

/// syncmeta workspace tools.
#[derive(Parser)]
#[command(name = "syncmeta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the workspace root
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Name of the per-directory metadata directory
    #[arg(global = true, long, default_value = syncmeta_store::DEFAULT_META_DIR)]
    meta_dir: String,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display the metadata recorded for one directory
    Inspect {
        /// Workspace-relative directory (defaults to the root)
        #[arg(short, long, default_value = "")]
        dir: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Check every metadata record for malformed content
    Verify,

    /// List out-of-sync resources
    Status {
        /// Workspace-relative directory to reconcile (defaults to the root)
        #[arg(short, long, default_value = "")]
        dir: String,

        /// JSON remote snapshot mapping paths to revisions (null for directories);
        /// without it the remote is assumed unchanged since the last update
        #[arg(short, long)]
        remote: Option<PathBuf>,

        /// Report conflicts where both sides reached the same state
        #[arg(long)]
        keep_pseudo_conflicts: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::new().meta_dir(cli.meta_dir.as_str());

    match cli.command {
        Commands::Inspect { dir, format } => {
            let path = cli.path.ok_or("Workspace path required for inspect")?;
            commands::inspect::run(&path, config, &dir, &format)?;
        }
        Commands::Verify => {
            let path = cli.path.ok_or("Workspace path required for verify")?;
            commands::verify::run(&path, &cli.meta_dir)?;
        }
        Commands::Status {
            dir,
            remote,
            keep_pseudo_conflicts,
            format,
        } => {
            let path = cli.path.ok_or("Workspace path required for status")?;
            let options = commands::status::StatusOptions {
                dir,
                remote,
                detect_pseudo_conflicts: !keep_pseudo_conflicts,
                format,
            };
            commands::status::run(&path, config, &options)?;
        }
        Commands::Version => {
            println!("syncmeta CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
