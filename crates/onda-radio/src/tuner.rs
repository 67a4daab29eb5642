//! The tuner front-end boundary.
//!
//! [`TunerBackend`] is the seam between the DSP core and whatever
//! produces IQ samples: USB hardware in a full receiver, a capture file
//! or a signal synthesizer here. The contract mirrors the needs of the
//! sample thread:
//!
//! - `read_iq` fills a caller-sized buffer with interleaved signed
//!   8-bit IQ and must return within one second even when the receiver
//!   is being shut down (blocking reads need an internal wakeup)
//! - a short read or `Ok(0)` signals end of stream; the engine drains
//!   and stops
//! - unsigned-byte front-ends are expected to pre-bias samples by
//!   subtracting 128 before handing them over

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::RadioError;

/// Gain request from the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    /// Fixed gain in decibels.
    Db(u32),
    /// Hand gain control to the AGC.
    Auto,
}

/// A source of IQ samples with tuning controls.
pub trait TunerBackend: Send {
    /// Fill `buffer` with interleaved signed 8-bit IQ samples.
    ///
    /// Returns the number of bytes written; zero means the stream is
    /// exhausted. Must return within one second of a shutdown request.
    fn read_iq(&mut self, buffer: &mut [i8]) -> Result<usize, RadioError>;

    /// Tune to `frequency_hz`.
    fn set_frequency(&mut self, frequency_hz: u64) -> Result<(), RadioError>;

    /// The currently tuned frequency in hertz.
    fn frequency(&self) -> u64;

    /// Set the front-end sample rate in samples per second.
    fn set_sample_rate(&mut self, samples_per_second: u32) -> Result<(), RadioError>;

    /// The front-end sample rate.
    fn sample_rate(&self) -> u32;

    /// Set the front-end bandwidth in hertz.
    fn set_bandwidth(&mut self, bandwidth_hz: u32) -> Result<(), RadioError>;

    /// The front-end bandwidth in hertz.
    fn bandwidth(&self) -> u32;

    /// Set the IF gain in decibels.
    fn set_gain_db(&mut self, gain_db: u32) -> Result<(), RadioError>;

    /// Read back the IF gain in decibels.
    fn gain_db(&self) -> Result<u32, RadioError>;

    /// Apply a frequency-correction factor in parts per million.
    fn set_warp_ppm(&mut self, ppm: i32) -> Result<(), RadioError>;
}

/// Replays interleaved signed 8-bit IQ from a capture file.
///
/// Tuning operations are recorded but do not affect playback; the
/// capture is whatever it is.
pub struct FileTuner {
    capture: File,
    frequency_hz: u64,
    sample_rate: u32,
    bandwidth_hz: u32,
    gain_db: u32,
    warp_ppm: i32,
    /// Set when the capture stores unsigned bytes that need biasing.
    unsigned_source: bool,
    /// Read scratch; grows once to the block size, then stays put.
    scratch: Vec<u8>,
}

impl FileTuner {
    /// Open a capture of signed 8-bit IQ samples.
    pub fn open(path: &Path) -> Result<Self, RadioError> {
        Ok(Self {
            capture: File::open(path)?,
            frequency_hz: 0,
            sample_rate: 256_000,
            bandwidth_hz: 0,
            gain_db: 24,
            warp_ppm: 0,
            unsigned_source: false,
            scratch: Vec::new(),
        })
    }

    /// Open a capture of unsigned 8-bit IQ samples (the raw RTL-SDR
    /// format); each byte is biased by -128 on read.
    pub fn open_unsigned(path: &Path) -> Result<Self, RadioError> {
        let mut tuner = Self::open(path)?;
        tuner.unsigned_source = true;
        Ok(tuner)
    }
}

impl TunerBackend for FileTuner {
    fn read_iq(&mut self, buffer: &mut [i8]) -> Result<usize, RadioError> {
        self.scratch.resize(buffer.len(), 0);
        let mut filled = 0;

        // Loop over short reads so a block is either full or final.
        while filled < self.scratch.len() {
            let n = self.capture.read(&mut self.scratch[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }

        for (out, &byte) in buffer.iter_mut().zip(&self.scratch[..filled]) {
            *out = if self.unsigned_source {
                (i16::from(byte) - 128) as i8
            } else {
                byte as i8
            };
        }

        Ok(filled)
    }

    fn set_frequency(&mut self, frequency_hz: u64) -> Result<(), RadioError> {
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    fn frequency(&self) -> u64 {
        self.frequency_hz
    }

    fn set_sample_rate(&mut self, samples_per_second: u32) -> Result<(), RadioError> {
        self.sample_rate = samples_per_second;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_bandwidth(&mut self, bandwidth_hz: u32) -> Result<(), RadioError> {
        self.bandwidth_hz = bandwidth_hz;
        Ok(())
    }

    fn bandwidth(&self) -> u32 {
        self.bandwidth_hz
    }

    fn set_gain_db(&mut self, gain_db: u32) -> Result<(), RadioError> {
        self.gain_db = gain_db;
        Ok(())
    }

    fn gain_db(&self) -> Result<u32, RadioError> {
        Ok(self.gain_db)
    }

    fn set_warp_ppm(&mut self, ppm: i32) -> Result<(), RadioError> {
        self.warp_ppm = ppm;
        Ok(())
    }
}

/// A transmitting station simulated by [`ToneTuner`].
#[derive(Debug, Clone, Copy)]
pub struct Station {
    /// Carrier frequency in hertz.
    pub frequency_hz: u64,
    /// Carrier amplitude in raw 8-bit sample units.
    pub amplitude: f32,
}

/// Synthesizes IQ blocks containing carriers for a set of stations.
///
/// A station within half the sample rate of the tuned frequency appears
/// as a complex tone at the difference frequency; everything else is a
/// floor of small deterministic dither so level measurements never sit
/// exactly still.
pub struct ToneTuner {
    stations: Vec<Station>,
    frequency_hz: u64,
    sample_rate: u32,
    bandwidth_hz: u32,
    gain_db: u32,
    warp_ppm: i32,
    phase_index: u64,
    dither_state: u32,
    /// Pace reads to the nominal sample rate, like hardware would.
    realtime: bool,
}

impl ToneTuner {
    /// Create a synthesizer carrying the given stations.
    ///
    /// Reads are paced to wall-clock time by default so consumers see
    /// hardware-like block timing; disable with
    /// [`set_realtime`](Self::set_realtime) for batch use.
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations,
            frequency_hz: 0,
            sample_rate: 256_000,
            bandwidth_hz: 0,
            gain_db: 24,
            warp_ppm: 0,
            phase_index: 0,
            dither_state: 0x2545_f491,
            realtime: true,
        }
    }

    /// Enable or disable wall-clock pacing of reads.
    pub fn set_realtime(&mut self, realtime: bool) {
        self.realtime = realtime;
    }

    fn dither(&mut self) -> f32 {
        self.dither_state = self
            .dither_state
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
        // Two bits of noise, centered.
        ((self.dither_state >> 30) as f32) - 1.5
    }
}

impl TunerBackend for ToneTuner {
    fn read_iq(&mut self, buffer: &mut [i8]) -> Result<usize, RadioError> {
        let sample_rate = f64::from(self.sample_rate);

        if self.realtime {
            let pairs = buffer.len() / 2;
            let block_seconds = pairs as f64 / sample_rate;
            std::thread::sleep(std::time::Duration::from_secs_f64(block_seconds));
        }

        for pair in buffer.chunks_exact_mut(2) {
            let time = self.phase_index as f64 / sample_rate;
            let mut i_sum = self.dither();
            let mut q_sum = self.dither();

            for station in &self.stations {
                let offset_hz = station.frequency_hz as f64 - self.frequency_hz as f64;
                if offset_hz.abs() >= sample_rate / 2.0 {
                    continue;
                }
                let phase = 2.0 * std::f64::consts::PI * offset_hz * time;
                i_sum += station.amplitude * phase.cos() as f32;
                q_sum += station.amplitude * phase.sin() as f32;
            }

            pair[0] = i_sum.clamp(-127.0, 127.0) as i8;
            pair[1] = q_sum.clamp(-127.0, 127.0) as i8;
            self.phase_index += 1;
        }

        Ok(buffer.len())
    }

    fn set_frequency(&mut self, frequency_hz: u64) -> Result<(), RadioError> {
        self.frequency_hz = frequency_hz;
        Ok(())
    }

    fn frequency(&self) -> u64 {
        self.frequency_hz
    }

    fn set_sample_rate(&mut self, samples_per_second: u32) -> Result<(), RadioError> {
        if samples_per_second == 0 {
            return Err(RadioError::Tuner("sample rate must be nonzero".into()));
        }
        self.sample_rate = samples_per_second;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_bandwidth(&mut self, bandwidth_hz: u32) -> Result<(), RadioError> {
        self.bandwidth_hz = bandwidth_hz;
        Ok(())
    }

    fn bandwidth(&self) -> u32 {
        self.bandwidth_hz
    }

    fn set_gain_db(&mut self, gain_db: u32) -> Result<(), RadioError> {
        self.gain_db = gain_db;
        Ok(())
    }

    fn gain_db(&self) -> Result<u32, RadioError> {
        Ok(self.gain_db)
    }

    fn set_warp_ppm(&mut self, ppm: i32) -> Result<(), RadioError> {
        self.warp_ppm = ppm;
        Ok(())
    }
}
