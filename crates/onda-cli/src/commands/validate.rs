//! Configuration validation command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use onda_config::{ReceiverConfig, validate_config};

#[derive(Args)]
pub struct ValidateArgs {
    /// Configuration file to validate
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
}

pub fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let config = ReceiverConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    validate_config(&config)
        .with_context(|| format!("{} failed validation", args.config.display()))?;

    println!("{} is valid", args.config.display());
    Ok(())
}
