use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    inspect::{self, InspectArgs},
    sample::{self, SampleArgs},
};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "ergm-sim", about = "Constrained network sampler CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run sampling chains for a problem file and a YAML run configuration.
    Sample(SampleArgs),
    /// Report the free dyads implied by a problem file's constraints.
    Inspect(InspectArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Sample(args) => sample::run(&args),
        Command::Inspect(args) => inspect::run(&args),
    }
}

/// Installs the global fmt subscriber; DEBUG when verbose, INFO otherwise.
pub(crate) fn setup_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
