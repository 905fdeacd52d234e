//! Relayout CLI - Command line interface for Relayout
//!
//! Convert git repositories between the regular layout and the
//! bare-in-.git worktree layout.

mod commands;

use clap::{Parser, Subcommand};
use relayout_core::Config;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{DoctorArgs, ToBareArgs, ToRegularArgs};

/// Relayout: switch git repositories between regular and bare worktree layouts
#[derive(Parser, Debug)]
#[command(name = "relayout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worktree path template (overrides config and env)
    #[arg(long, global = true, env = "RELAYOUT_WORKTREE_FORMAT")]
    format: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a regular repository to the bare-in-.git layout
    ToBare(ToBareArgs),

    /// Convert a bare-in-.git repository back to a regular one
    ToRegular(ToRegularArgs),

    /// Check worktree links and optionally repair them
    Doctor(DoctorArgs),

    /// Show current configuration
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Load configuration with overrides
    let config = Config::load_with_overrides(cli.format.clone())?;

    tracing::debug!(
        worktree_format = %config.migrate.worktree_format,
        "Configuration loaded"
    );

    match cli.command {
        Some(Commands::ToBare(args)) => args.execute(&config)?,
        Some(Commands::ToRegular(args)) => args.execute(&config)?,
        Some(Commands::Doctor(args)) => args.execute()?,
        Some(Commands::Config) => {
            println!("Relayout Configuration");
            println!("======================");
            println!();
            println!("Migrate Settings:");
            println!("  worktree_format: {}", config.migrate.worktree_format);
            println!();
            if let Some(path) = Config::default_config_path() {
                println!("Config file: {}", path.display());
                if path.exists() {
                    println!("  (exists)");
                } else {
                    println!("  (not found - using defaults)");
                }
            }
        }
        None => {
            println!("Relayout - switch git repositories between worktree layouts");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
