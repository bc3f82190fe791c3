mod cli;
mod commands;
mod error;
mod logging;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use clap::Parser;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\nError: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    std::panic::set_hook(Box::new(|pi| {
        error!("{}", pi);
    }));

    info!("alchemd CLI v{} starting up.", env!("CARGO_PKG_VERSION"));
    debug!("Full CLI arguments parsed: {:?}", &cli);

    let command_result: Result<()> = match cli.command {
        Commands::Squash(args) => {
            info!("Dispatching to 'squash' command.");
            commands::squash::run(args)
        }
        Commands::Unsquash(args) => {
            info!("Dispatching to 'unsquash' command.");
            commands::unsquash::run(args)
        }
        Commands::Restraint(args) => {
            info!("Dispatching to 'restraint' command.");
            commands::restraint::run(args)
        }
    };

    match &command_result {
        Ok(()) => info!("Command completed successfully."),
        Err(e @ CliError::Core(_)) if e.exit_code() == 2 => {
            error!("Command failed, feature not implemented: {}", e);
        }
        Err(e) => error!("Command failed: {}", e),
    }

    command_result
}
