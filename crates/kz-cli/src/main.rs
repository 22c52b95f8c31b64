//! Command-line runner for Kadenz simulations.

mod commands;
mod tui;

use std::process;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};

use commands::batch::BatchArgs;
use commands::run::RunArgs;

#[derive(Parser)]
#[command(
    name = "kz",
    about = "Kadenz: deterministic multi-rate simulation runner",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one chain scene, headless, in a terminal viewer or recorded
    Run(RunArgs),

    /// Simulate several seeded chain scenes on a worker pool
    Batch(BatchArgs),
}

fn main() {
    Builder::from_env(Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Batch(args) => commands::batch::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
