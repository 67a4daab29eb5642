//! Onda Demod - the receiver's demodulation cascades.
//!
//! Each chain accepts blocks of interleaved 8-bit IQ samples at
//! 256 kS/s and produces 16-bit PCM at 8 kS/s, walking the rate ladder
//! 256 k -> 64 k -> 16 k -> 8 k (WBFM takes 64 k -> 32 k -> 8 k after
//! its discriminator). The chains share the same building blocks from
//! [`onda_dsp`] and differ only in their nonlinear estimator:
//!
//! - [`AmDemodulator`] - envelope by magnitude estimation
//! - [`FmDemodulator`] - phase-difference discriminator
//! - [`WbFmDemodulator`] - discriminator plus de-emphasis, wider audio
//! - [`SsbDemodulator`] - Hilbert pair and sideband combine
//!
//! [`Demodulator`] owns all four and switches between them at block
//! boundaries.

pub mod am;
pub mod coefficients;
pub mod dispatcher;
pub mod fm;
pub mod ssb;
pub mod wbfm;

pub use am::AmDemodulator;
pub use dispatcher::{DemodMode, Demodulator, ModeParseError};
pub use fm::FmDemodulator;
pub use ssb::{Sideband, SsbDemodulator};
pub use wbfm::WbFmDemodulator;

/// Scale and clamp a demodulated sample into the 16-bit PCM range.
#[inline]
pub(crate) fn clamp_to_pcm(sample: f32) -> i16 {
    sample.clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// IQ pairs consumed per PCM sample by every chain (256 k -> 8 k).
pub const DECIMATION_RATIO: usize = 32;
