// ABOUTME: Entry point for the stagehand CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use stagehand::config::{self, Config};
use stagehand::deploy::LogDirectory;
use stagehand::error::Result;
use stagehand::types::DeploymentId;
use std::env;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cwd = env::current_dir()?;

    match cli.command {
        Commands::Init { force } => {
            let path = config::init_config(&cwd, force)?;
            println!("Wrote {}", path.display());
            Ok(())
        }
        Commands::Status => {
            let config = Config::discover(&cwd)?;
            println!("Log directory: {}", config.log_dir.display());
            println!("Re-plan policy: {:?}", config.replan);
            Ok(())
        }
        Commands::Log { id } => {
            let config = Config::discover(&cwd)?;
            let logs = LogDirectory::new(config.log_dir);
            let log = logs.for_deployment(&DeploymentId::new(id));
            println!("{}", log.read()?);
            Ok(())
        }
    }
}
