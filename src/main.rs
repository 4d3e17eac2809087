//! Main entry point for rowdiff CLI

use clap::Parser;
use rowdiff::cli::Cli;
use rowdiff::commands::execute_command;

fn main() {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging; --verbose raises the filter to debug
    env_logger::Builder::from_default_env()
        .filter_level(cli.log_level())
        .init();

    // Execute the command
    if let Err(e) = execute_command(cli.command) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
