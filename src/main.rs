//! Main entry point for dreqdiff CLI

use clap::Parser;
use dreqdiff::cli::Cli;
use dreqdiff::commands::execute_command;

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    cli.logger().init();

    if let Err(e) = execute_command(cli.command, cli.config.as_deref()) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
