//! Wide-band FM demodulation.
//!
//! Same discriminator as the narrow-band chain, with two differences on
//! the audio side: a single-pole de-emphasis filter directly after the
//! discriminator (broadcast FM pre-emphasizes treble at the
//! transmitter), and a wider audio path that holds 32 kS/s until the
//! final decimation so more of the recovered baseband survives.
//!
//! The de-emphasis filter is exposed with configurable coefficients
//! because its time constant is a broadcast-locale property: 75 us in
//! the Americas, 50 us in most of the rest of the world.

use onda_dsp::{Decimator, DspError, IirFilter};

use crate::clamp_to_pcm;
use crate::coefficients::{
    DC_REMOVAL_DENOMINATOR, DC_REMOVAL_NUMERATOR, TUNER_DECIMATOR_48, WBFM_AUDIO_DECIMATOR_32,
    WBFM_POST_DEMOD_DECIMATOR_16,
};

/// Nominal demodulator gain for the wide-band discriminator swing.
const DEFAULT_DEMOD_GAIN: f32 = 9000.0;

/// De-emphasis pole for a 75 us time constant at the 64 kS/s
/// discriminator rate: `exp(-1 / (64000 * 75e-6))`.
const DEEMPHASIS_POLE_75US: f32 = 0.811935;

const BLOCK_CAPACITY: usize = 16384 / 4;

/// Wide-band FM demodulation chain: 256 kS/s IQ in, 8 kS/s PCM out.
pub struct WbFmDemodulator {
    i_tuner_decimator: Decimator,
    q_tuner_decimator: Decimator,
    post_demod_decimator: Decimator,
    audio_decimator: Decimator,
    deemphasis: IirFilter,
    dc_removal: IirFilter,
    demod_gain: f32,

    previous_i: f32,
    previous_q: f32,

    i_data: Vec<f32>,
    q_data: Vec<f32>,
    pcm: Vec<i16>,
}

impl WbFmDemodulator {
    /// Create a chain with nominal gain and 75 us de-emphasis.
    pub fn new() -> Self {
        Self {
            i_tuner_decimator: Decimator::new(&TUNER_DECIMATOR_48, 4)
                .expect("tuner table is a compile-time constant"),
            q_tuner_decimator: Decimator::new(&TUNER_DECIMATOR_48, 4)
                .expect("tuner table is a compile-time constant"),
            post_demod_decimator: Decimator::new(&WBFM_POST_DEMOD_DECIMATOR_16, 2)
                .expect("post-demod table is a compile-time constant"),
            audio_decimator: Decimator::new(&WBFM_AUDIO_DECIMATOR_32, 4)
                .expect("audio table is a compile-time constant"),
            deemphasis: Self::deemphasis_filter(DEEMPHASIS_POLE_75US),
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

    /// Build a unity-DC-gain single-pole lowpass for a pole at `r`.
    fn deemphasis_filter(r: f32) -> IirFilter {
        // y[n] = (1-r) x[n] + r y[n-1], expressed under the subtract
        // convention as b = [1-r], a = [-r].
        IirFilter::new(&[1.0 - r], &[-r]).expect("single-pole taps are well-formed")
    }

    /// Replace the de-emphasis filter with explicit coefficients.
    ///
    /// # Errors
    ///
    /// Returns the underlying construction error for empty tap slices.
    pub fn set_deemphasis(&mut self, numerator: &[f32], denominator: &[f32]) -> Result<(), DspError> {
        self.deemphasis = IirFilter::new(numerator, denominator)?;
        Ok(())
    }

    /// Set the de-emphasis from a time constant in microseconds,
    /// evaluated at the 64 kS/s discriminator rate.
    pub fn set_deemphasis_time_constant(&mut self, microseconds: f32) {
        let pole = libm::expf(-1.0 / (64_000.0 * microseconds * 1e-6));
        self.deemphasis = Self::deemphasis_filter(pole);
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

            let deemphasized = self.deemphasis.filter(frequency);
            let audio = self.demod_gain * self.dc_removal.filter(deemphasized);

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
        self.deemphasis.reset();
        self.dc_removal.reset();
        self.previous_i = 0.0;
        self.previous_q = 0.0;
    }
}

impl Default for WbFmDemodulator {
    fn default() -> Self {
        Self::new()
    }
}
