//! Polyphase 1:L interpolation.
//!
//! A prototype lowpass of N taps is split into L sub-filters of q = N/L
//! taps each, where sub-filter i takes every L-th prototype tap starting
//! at offset i:
//!
//! ```text
//! p0  : h[0], h[L],   h[2L], ...
//! p1  : h[1], h[L+1], h[2L+1], ...
//! ...
//! pL-1: h[L-1], h[2L-1], h[3L-1], ...
//! ```
//!
//! All sub-filters share a single q-deep state ring that advances once
//! per *input* sample. Each input therefore costs N multiplies total -
//! the same as the prototype filter running at the low rate - while
//! producing L output samples.
//!
//! The sub-filters are stored contiguously (`p0` then `p1` ...) and are
//! evaluated in that order against the same ring position; the ring
//! advances only after the last sub-filter has run. Both details are
//! load-bearing: they fix the output ordering.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::DspError;

/// Interpolating polyphase FIR: L outputs for every input.
///
/// # Example
///
/// ```rust
/// use onda_dsp::Interpolator;
///
/// let mut interpolator = Interpolator::new(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
/// let mut frame = [0.0f32; 2];
/// interpolator.interpolate(1.0, &mut frame);
/// assert_eq!(frame, [1.0, 2.0]);
/// interpolator.interpolate(0.0, &mut frame);
/// assert_eq!(frame, [3.0, 4.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Interpolator {
    /// Permuted taps: L runs of q coefficients each.
    subfilters: Vec<f32>,
    state: Vec<f32>,
    index: usize,
    factor: usize,
    /// Taps per sub-filter (q = N / L).
    subfilter_length: usize,
}

impl Interpolator {
    /// Create an interpolator from prototype taps and an interpolation
    /// factor.
    ///
    /// # Errors
    ///
    /// Returns [`DspError::ZeroFactor`] for `factor == 0`,
    /// [`DspError::EmptyTaps`] for an empty prototype, and
    /// [`DspError::TapCountNotMultiple`] when `factor` does not divide
    /// the prototype length.
    pub fn new(prototype: &[f32], factor: usize) -> Result<Self, DspError> {
        if factor == 0 {
            return Err(DspError::ZeroFactor);
        }
        if prototype.is_empty() {
            return Err(DspError::EmptyTaps);
        }
        if prototype.len() % factor != 0 {
            return Err(DspError::TapCountNotMultiple {
                taps: prototype.len(),
                factor,
            });
        }

        let subfilter_length = prototype.len() / factor;

        // Permute the prototype so each sub-filter's taps are contiguous.
        let mut subfilters = Vec::with_capacity(prototype.len());
        for phase in 0..factor {
            for tap in 0..subfilter_length {
                subfilters.push(prototype[phase + tap * factor]);
            }
        }

        Ok(Self {
            subfilters,
            state: vec![0.0; subfilter_length],
            index: 0,
            factor,
            subfilter_length,
        })
    }

    /// Interpolation factor L.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Consume one input sample and write L output samples into `frame`.
    ///
    /// # Panics
    ///
    /// Panics if `frame` holds fewer than L samples.
    #[inline]
    pub fn interpolate(&mut self, x: f32, frame: &mut [f32]) {
        assert!(frame.len() >= self.factor, "output frame shorter than L");

        self.state[self.index] = x;

        for phase in 0..self.factor {
            let taps =
                &self.subfilters[phase * self.subfilter_length..(phase + 1) * self.subfilter_length];
            frame[phase] = self.filter_phase(taps);
        }

        // One ring advance per input sample, after every phase has seen
        // the same state.
        self.index += 1;
        if self.index == self.subfilter_length {
            self.index = 0;
        }
    }

    #[inline]
    fn filter_phase(&self, taps: &[f32]) -> f32 {
        let mut slot = self.index;
        let mut y = 0.0;

        for &tap in taps {
            y += tap * self.state[slot];
            slot = if slot == 0 {
                self.subfilter_length - 1
            } else {
                slot - 1
            };
        }

        y
    }

    /// Zero the shared state ring.
    pub fn reset(&mut self) {
        self.index = 0;
        for slot in &mut self.state {
            *slot = 0.0;
        }
    }
}
