//! Narrow-band FM demodulation.
//!
//! The discriminator recovers the instantaneous frequency as the phase
//! difference between consecutive complex samples:
//!
//! ```text
//! y[n] = atan2(I[n]*Q[n-1] - Q[n]*I[n-1],
//!              I[n]*I[n-1] + Q[n]*Q[n-1])
//! ```
//!
//! which is the argument of `z[n] * conj(z[n-1])` up to the receiver's
//! historical sign convention on the imaginary part. The discriminator
//! runs at 64 kS/s after the tuner decimator; the recovered audio is
//! DC-blocked and decimated to 8 kS/s.

use onda_dsp::{Decimator, IirFilter};

use crate::clamp_to_pcm;
use crate::coefficients::{
    AUDIO_DECIMATOR_40, DC_REMOVAL_DENOMINATOR, DC_REMOVAL_NUMERATOR, POST_DEMOD_DECIMATOR_12,
    TUNER_DECIMATOR_48,
};

/// Nominal demodulator gain: scales the discriminator's radian output
/// so a voice signal with a few kilohertz of deviation lands at a
/// comfortable PCM level.
const DEFAULT_DEMOD_GAIN: f32 = 20000.0;

const BLOCK_CAPACITY: usize = 16384 / 4;

/// Narrow-band FM demodulation chain: 256 kS/s IQ in, 8 kS/s PCM out.
pub struct FmDemodulator {
    i_tuner_decimator: Decimator,
    q_tuner_decimator: Decimator,
    post_demod_decimator: Decimator,
    audio_decimator: Decimator,
    dc_removal: IirFilter,
    demod_gain: f32,

    /// Previous complex sample for the phase difference.
    previous_i: f32,
    previous_q: f32,

    i_data: Vec<f32>,
    q_data: Vec<f32>,
    pcm: Vec<i16>,
}

impl FmDemodulator {
    /// Create a chain with nominal gain.
    pub fn new() -> Self {
        Self {
            i_tuner_decimator: Decimator::new(&TUNER_DECIMATOR_48, 4)
                .expect("tuner table is a compile-time constant"),
            q_tuner_decimator: Decimator::new(&TUNER_DECIMATOR_48, 4)
                .expect("tuner table is a compile-time constant"),
            post_demod_decimator: Decimator::new(&POST_DEMOD_DECIMATOR_12, 4)
                .expect("post-demod table is a compile-time constant"),
            audio_decimator: Decimator::new(&AUDIO_DECIMATOR_40, 2)
                .expect("audio table is a compile-time constant"),
            dc_removal: IirFilter::new(&DC_REMOVAL_NUMERATOR, &DC_REMOVAL_DENOMINATOR)
                .expect("DC-removal taps are compile-time constants"),
            demod_gain: DEFAULT_DEMOD_GAIN,
            previous_i: 0.0,
            previous_q: 0.0,
            i_data: Vec::with_capacity(BLOCK_CAPACITY),
            q_data: Vec::with_capacity(BLOCK_CAPACITY),
            pcm: Vec::with_capacity(BLOCK_CAPACITY / 8),
        }
    }

    /// Set the demodulator gain.
    pub fn set_demod_gain(&mut self, gain: f32) {
        self.demod_gain = gain;
    }

    /// The current demodulator gain.
    pub fn demod_gain(&self) -> f32 {
        self.demod_gain
    }

    /// Demodulate one block of interleaved 8-bit IQ samples.
    pub fn accept_iq(&mut self, block: &[i8]) -> &[i16] {
        self.reduce_sample_rate(block);
        self.demodulate_to_pcm();
        &self.pcm
    }

    fn reduce_sample_rate(&mut self, block: &[i8]) {
        self.i_data.clear();
        self.q_data.clear();

        for pair in block.chunks_exact(2) {
            if let Some(sample) = self.i_tuner_decimator.decimate(f32::from(pair[0])) {
                self.i_data.push(sample);
            }
            if let Some(sample) = self.q_tuner_decimator.decimate(f32::from(pair[1])) {
                self.q_data.push(sample);
            }
        }
    }

    fn demodulate_to_pcm(&mut self) {
        self.pcm.clear();

        for (&i, &q) in self.i_data.iter().zip(&self.q_data) {
            let numerator = i * self.previous_q - q * self.previous_i;
            let denominator = i * self.previous_i + q * self.previous_q;
            let frequency = libm::atan2f(numerator, denominator);

            self.previous_i = i;
            self.previous_q = q;

            let audio = self.demod_gain * self.dc_removal.filter(frequency);

            if let Some(sample) = self.post_demod_decimator.decimate(audio)
                && let Some(sample) = self.audio_decimator.decimate(sample)
            {
                self.pcm.push(clamp_to_pcm(sample));
            }
        }
    }

    /// Clear every filter in the chain and the discriminator history.
    pub fn reset(&mut self) {
        self.i_tuner_decimator.reset();
        self.q_tuner_decimator.reset();
        self.post_demod_decimator.reset();
        self.audio_decimator.reset();
        self.dc_removal.reset();
        self.previous_i = 0.0;
        self.previous_q = 0.0;
    }
}

impl Default for FmDemodulator {
    fn default() -> Self {
        Self::new()
    }
}
