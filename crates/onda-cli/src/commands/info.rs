//! Configuration display command.

use std::path::PathBuf;

use clap::Args;
use onda_config::{ReceiverConfig, validate_config};

#[derive(Args)]
pub struct InfoArgs {
    /// Configuration file; omit to show the built-in defaults
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,
}

pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    let (config, source) = match &args.config {
        Some(path) => (ReceiverConfig::load(path)?, path.display().to_string()),
        None => (ReceiverConfig::default(), "built-in defaults".to_string()),
    };

    println!("Receiver configuration ({source})");
    println!("  frequency      : {} Hz", config.frequency_hz);
    println!("  sample rate    : {} S/s", config.sample_rate);
    println!("  bandwidth      : {} Hz", config.bandwidth_hz);
    println!("  gain           : {}", config.gain);
    println!("  warp           : {} ppm", config.warp_ppm);
    println!("  mode           : {}", config.mode);
    println!("  AGC            : op {} dBFS, alpha {}, deadband {} dB, blanking {}",
        config.agc.operating_point_dbfs,
        config.agc.alpha,
        config.agc.deadband_db,
        config.agc.blanking_limit,
    );
    println!("  squelch        : {} dBFS", config.squelch.threshold_dbfs);

    match &config.scanner {
        Some(scanner) => println!(
            "  scanner        : {} Hz to {} Hz in {} Hz steps",
            scanner.start_hz, scanner.end_hz, scanner.step_hz
        ),
        None => println!("  scanner        : not configured"),
    }

    for override_entry in &config.demod_gains {
        println!(
            "  demod gain     : {} = {}",
            override_entry.mode, override_entry.gain
        );
    }

    match validate_config(&config) {
        Ok(()) => println!("  status         : valid"),
        Err(error) => println!("  status         : INVALID - {error}"),
    }

    Ok(())
}
