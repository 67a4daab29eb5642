//! Synthetic IQ capture generation.
//!
//! Produces interleaved 8-bit IQ files at 256 kS/s for exercising the
//! demodulation chains without a tuner: a bare carrier, an AM-modulated
//! tone, or an FM-modulated tone.

use std::f64::consts::PI;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Subcommand};

/// Capture sample rate in samples per second.
const SAMPLE_RATE: f64 = 256_000.0;

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    command: GenerateCommand,
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// An unmodulated carrier at an offset from the capture center
    Carrier {
        /// Output capture file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Carrier offset from center in Hz
        #[arg(long, default_value_t = 1000.0)]
        offset: f64,

        /// Carrier amplitude in 8-bit sample units
        #[arg(long, default_value_t = 100.0)]
        amplitude: f64,

        /// Capture length in seconds
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
    },

    /// A carrier amplitude-modulated by a single tone
    Am {
        /// Output capture file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Carrier offset from center in Hz
        #[arg(long, default_value_t = 0.0)]
        offset: f64,

        /// Modulating tone frequency in Hz
        #[arg(long, default_value_t = 400.0)]
        tone: f64,

        /// Modulation depth (0-1)
        #[arg(long, default_value_t = 0.5)]
        depth: f64,

        /// Peak amplitude in 8-bit sample units
        #[arg(long, default_value_t = 80.0)]
        amplitude: f64,

        /// Capture length in seconds
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
    },

    /// A carrier frequency-modulated by a single tone
    Fm {
        /// Output capture file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Carrier offset from center in Hz
        #[arg(long, default_value_t = 0.0)]
        offset: f64,

        /// Modulating tone frequency in Hz
        #[arg(long, default_value_t = 400.0)]
        tone: f64,

        /// Peak frequency deviation in Hz
        #[arg(long, default_value_t = 4000.0)]
        deviation: f64,

        /// Carrier amplitude in 8-bit sample units
        #[arg(long, default_value_t = 100.0)]
        amplitude: f64,

        /// Capture length in seconds
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,
    },
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let (output, capture) = match args.command {
        GenerateCommand::Carrier {
            output,
            offset,
            amplitude,
            seconds,
        } => (output, carrier(offset, amplitude, seconds)),
        GenerateCommand::Am {
            output,
            offset,
            tone,
            depth,
            amplitude,
            seconds,
        } => (output, am_tone(offset, tone, depth, amplitude, seconds)),
        GenerateCommand::Fm {
            output,
            offset,
            tone,
            deviation,
            amplitude,
            seconds,
        } => (output, fm_tone(offset, tone, deviation, amplitude, seconds)),
    };

    let mut file = std::fs::File::create(&output)
        .with_context(|| format!("creating {}", output.display()))?;
    file.write_all(&capture)?;

    println!(
        "wrote {} IQ pairs ({} bytes) to {}",
        capture.len() / 2,
        capture.len(),
        output.display()
    );
    Ok(())
}

fn sample_count(seconds: f64) -> usize {
    (seconds * SAMPLE_RATE) as usize
}

fn push_pair(capture: &mut Vec<u8>, i: f64, q: f64) {
    capture.push((i.clamp(-127.0, 127.0) as i8) as u8);
    capture.push((q.clamp(-127.0, 127.0) as i8) as u8);
}

fn carrier(offset: f64, amplitude: f64, seconds: f64) -> Vec<u8> {
    let mut capture = Vec::with_capacity(sample_count(seconds) * 2);
    for index in 0..sample_count(seconds) {
        let phase = 2.0 * PI * offset * index as f64 / SAMPLE_RATE;
        push_pair(
            &mut capture,
            amplitude * phase.cos(),
            amplitude * phase.sin(),
        );
    }
    capture
}

fn am_tone(offset: f64, tone: f64, depth: f64, amplitude: f64, seconds: f64) -> Vec<u8> {
    let mut capture = Vec::with_capacity(sample_count(seconds) * 2);
    for index in 0..sample_count(seconds) {
        let time = index as f64 / SAMPLE_RATE;
        let envelope = 1.0 + depth * (2.0 * PI * tone * time).sin();
        // Normalize so the peak envelope hits the requested amplitude.
        let scaled = amplitude * envelope / (1.0 + depth);
        let phase = 2.0 * PI * offset * time;
        push_pair(&mut capture, scaled * phase.cos(), scaled * phase.sin());
    }
    capture
}

fn fm_tone(offset: f64, tone: f64, deviation: f64, amplitude: f64, seconds: f64) -> Vec<u8> {
    let mut capture = Vec::with_capacity(sample_count(seconds) * 2);

    // Integrate the instantaneous frequency so the deviation is exact.
    let mut phase = 0.0f64;
    for index in 0..sample_count(seconds) {
        let time = index as f64 / SAMPLE_RATE;
        let instantaneous = offset + deviation * (2.0 * PI * tone * time).sin();
        phase += 2.0 * PI * instantaneous / SAMPLE_RATE;

        push_pair(
            &mut capture,
            amplitude * phase.cos(),
            amplitude * phase.sin(),
        );
    }
    capture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carrier_length_matches_duration() {
        let capture = carrier(1000.0, 100.0, 0.25);
        assert_eq!(capture.len(), 2 * 64_000);
    }

    #[test]
    fn am_envelope_stays_within_amplitude() {
        let capture = am_tone(0.0, 400.0, 1.0, 100.0, 0.05);
        let peak = capture
            .iter()
            .map(|&byte| (byte as i8).unsigned_abs())
            .max()
            .unwrap();
        assert!(peak <= 100, "envelope peak {peak} exceeded amplitude");
    }

    #[test]
    fn fm_capture_holds_constant_envelope() {
        let capture = fm_tone(0.0, 400.0, 4000.0, 90.0, 0.01);
        for pair in capture.chunks_exact(2) {
            let i = f64::from(pair[0] as i8);
            let q = f64::from(pair[1] as i8);
            let magnitude = (i * i + q * q).sqrt();
            assert!(
                (magnitude - 90.0).abs() < 2.0,
                "FM envelope wandered: {magnitude}"
            );
        }
    }
}
