//! Onda CLI - diagnostic shell for the onda SDR receiver.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "onda")]
#[command(author, version, about = "Onda SDR receiver diagnostic shell", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Demodulate an IQ capture file into a WAV file
    Demod(commands::demod::DemodArgs),

    /// Generate synthetic IQ capture files
    Generate(commands::generate::GenerateArgs),

    /// Display a receiver configuration
    Info(commands::info::InfoArgs),

    /// Validate a receiver configuration file
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Demod(args) => commands::demod::run(args),
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Info(args) => commands::info::run(args),
        Commands::Validate(args) => commands::validate::run(args),
    }
}
