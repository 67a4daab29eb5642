//! Capture demodulation command.
//!
//! Replays an IQ capture through the full receiver runtime - squelch,
//! AGC plumbing, and the selected demodulation chain - and writes the
//! recovered audio to a 16-bit mono WAV file.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use onda_demod::DemodMode;
use onda_demod::coefficients::AUDIO_DECIMATOR_40;
use onda_dsp::Interpolator;
use onda_radio::{FileTuner, Radio};

/// Audio sample rate of every demodulation chain.
const AUDIO_RATE: u32 = 8_000;

#[derive(Args)]
pub struct DemodArgs {
    /// Input IQ capture: interleaved 8-bit I/Q at 256 kS/s
    #[arg(value_name = "CAPTURE")]
    input: PathBuf,

    /// Output WAV file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Demodulation mode: am, fm, wbfm, lsb, or usb
    #[arg(long, default_value = "am")]
    mode: String,

    /// Treat the capture as unsigned bytes (raw RTL-SDR dumps)
    #[arg(long)]
    unsigned: bool,

    /// Squelch threshold in dBFS
    #[arg(long, default_value_t = -100)]
    squelch: i32,

    /// Demodulator gain override
    #[arg(long)]
    demod_gain: Option<f32>,

    /// Polyphase-upsample the audio by 4 to 32 kS/s
    #[arg(long)]
    upsample: bool,
}

pub fn run(args: DemodArgs) -> anyhow::Result<()> {
    let mode: DemodMode = args.mode.parse()?;

    let tuner = if args.unsigned {
        FileTuner::open_unsigned(&args.input)
    } else {
        FileTuner::open(&args.input)
    }
    .with_context(|| format!("opening capture {}", args.input.display()))?;

    let mut radio = Radio::new(Box::new(tuner))?;
    radio.set_mode(mode);
    radio.set_squelch_threshold(args.squelch);
    if let Some(gain) = args.demod_gain {
        radio.set_demod_gain(mode, gain);
    }

    let audio = Arc::new(Mutex::new(Vec::<i16>::new()));
    let gated_blocks = Arc::new(AtomicUsize::new(0));

    let sink_audio = Arc::clone(&audio);
    let sink_blocks = Arc::clone(&gated_blocks);
    radio.start(Box::new(move |pcm: &[i16]| {
        sink_audio.lock().unwrap().extend_from_slice(pcm);
        sink_blocks.fetch_add(1, Ordering::Relaxed);
    }))?;

    // The sample thread exits on its own when the capture runs dry.
    while radio.is_running() {
        std::thread::sleep(Duration::from_millis(10));
    }
    radio.stop();

    let mut samples = std::mem::take(
        &mut *audio
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()),
    );

    let sample_rate = if args.upsample {
        samples = upsample_by_4(&samples)?;
        AUDIO_RATE * 4
    } else {
        AUDIO_RATE
    };

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;
    for &sample in &samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    println!(
        "{} block(s) passed the squelch; wrote {} samples at {} S/s to {}",
        gated_blocks.load(Ordering::Relaxed),
        samples.len(),
        sample_rate,
        args.output.display()
    );
    Ok(())
}

/// Upsample 8 kS/s audio to 32 kS/s with two 1:2 polyphase stages.
///
/// The prototype is the receiver's 3.4 kHz audio lowpass; each stage
/// restores unity gain by scaling its outputs by the interpolation
/// factor.
fn upsample_by_4(samples: &[i16]) -> anyhow::Result<Vec<i16>> {
    let mut current: Vec<f32> = samples.iter().map(|&sample| f32::from(sample)).collect();

    for _ in 0..2 {
        let mut interpolator = Interpolator::new(&AUDIO_DECIMATOR_40, 2)?;
        let mut next = Vec::with_capacity(current.len() * 2);
        let mut frame = [0.0f32; 2];

        for &sample in &current {
            interpolator.interpolate(sample, &mut frame);
            next.push(2.0 * frame[0]);
            next.push(2.0 * frame[1]);
        }
        current = next;
    }

    Ok(current
        .into_iter()
        .map(|sample| sample.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsample_quadruples_the_sample_count() {
        let audio: Vec<i16> = (0..800).map(|index| (index % 128) as i16).collect();
        let upsampled = upsample_by_4(&audio).unwrap();
        assert_eq!(upsampled.len(), audio.len() * 4);
    }

    #[test]
    fn upsample_preserves_silence() {
        let silence = vec![0i16; 400];
        let upsampled = upsample_by_4(&silence).unwrap();
        assert!(upsampled.iter().all(|&sample| sample == 0));
    }
}
