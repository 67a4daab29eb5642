//! Commutated M:1 decimation.
//!
//! Rather than filtering at the input rate and discarding M-1 of every M
//! outputs, the decimator stages M input samples, shifts the first M-1
//! into the FIR state ring without touching the accumulator, and runs a
//! single convolution when the last sample of the group arrives. The
//! filter therefore runs at the *decimated* rate while the state ring
//! still sees every input sample - the commutator pattern.
//!
//! The tap count must be an exact multiple of the decimation factor so
//! that every convolution sees the same tap-to-sample phase alignment.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::DspError;
use crate::{FirFilter, FirFilterQ15};

/// Decimating FIR filter: one output for every `factor` inputs.
///
/// # Example
///
/// ```rust
/// use onda_dsp::Decimator;
///
/// let mut decimator = Decimator::new(&[0.5, 0.5], 2).unwrap();
/// assert_eq!(decimator.decimate(1.0), None);
/// assert_eq!(decimator.decimate(1.0), Some(1.0));
/// ```
#[derive(Debug, Clone)]
pub struct Decimator {
    filter: FirFilter,
    staging: Vec<f32>,
    staging_index: usize,
}

impl Decimator {
    /// Create a decimator from anti-aliasing taps and a decimation
    /// factor.
    ///
    /// # Errors
    ///
    /// Returns [`DspError::ZeroFactor`] for `factor == 0`,
    /// [`DspError::EmptyTaps`] for an empty tap slice, and
    /// [`DspError::TapCountNotMultiple`] when the tap count is not a
    /// multiple of `factor`.
    pub fn new(taps: &[f32], factor: usize) -> Result<Self, DspError> {
        validate_factor(taps.len(), factor)?;

        Ok(Self {
            filter: FirFilter::new(taps)?,
            staging: vec![0.0; factor],
            staging_index: 0,
        })
    }

    /// Decimation factor M.
    pub fn factor(&self) -> usize {
        self.staging.len()
    }

    /// Offer one input sample; returns the filtered output once every
    /// `factor` calls.
    #[inline]
    pub fn decimate(&mut self, x: f32) -> Option<f32> {
        self.staging[self.staging_index] = x;
        self.staging_index += 1;

        if self.staging_index < self.staging.len() {
            return None;
        }

        self.staging_index = 0;

        // Shift all but the final staged sample into the pipeline, then
        // let the convolution ingest the final one.
        for slot in 0..self.staging.len() - 1 {
            self.filter.shift_sample_in(self.staging[slot]);
        }

        Some(self.filter.filter(self.staging[self.staging.len() - 1]))
    }

    /// Clear the staging buffer and the filter state.
    pub fn reset(&mut self) {
        self.staging_index = 0;
        for slot in &mut self.staging {
            *slot = 0.0;
        }
        self.filter.reset();
    }
}

/// Fixed-point counterpart of [`Decimator`] built on [`FirFilterQ15`].
#[derive(Debug, Clone)]
pub struct DecimatorQ15 {
    filter: FirFilterQ15,
    staging: Vec<i16>,
    staging_index: usize,
}

impl DecimatorQ15 {
    /// Create a Q15 decimator by quantizing float anti-aliasing taps.
    ///
    /// # Errors
    ///
    /// As [`Decimator::new`], plus [`DspError::TapOutOfQ15Range`] for
    /// taps outside `[-1, 1)`.
    pub fn from_float_taps(taps: &[f32], factor: usize) -> Result<Self, DspError> {
        validate_factor(taps.len(), factor)?;

        Ok(Self {
            filter: FirFilterQ15::from_float_taps(taps)?,
            staging: vec![0; factor],
            staging_index: 0,
        })
    }

    /// Decimation factor M.
    pub fn factor(&self) -> usize {
        self.staging.len()
    }

    /// Offer one input sample; returns the filtered output once every
    /// `factor` calls.
    #[inline]
    pub fn decimate(&mut self, x: i16) -> Option<i16> {
        self.staging[self.staging_index] = x;
        self.staging_index += 1;

        if self.staging_index < self.staging.len() {
            return None;
        }

        self.staging_index = 0;

        for slot in 0..self.staging.len() - 1 {
            self.filter.shift_sample_in(self.staging[slot]);
        }

        Some(self.filter.filter(self.staging[self.staging.len() - 1]))
    }

    /// Clear the staging buffer and the filter state.
    pub fn reset(&mut self) {
        self.staging_index = 0;
        for slot in &mut self.staging {
            *slot = 0;
        }
        self.filter.reset();
    }
}

fn validate_factor(taps: usize, factor: usize) -> Result<(), DspError> {
    if factor == 0 {
        return Err(DspError::ZeroFactor);
    }
    if taps == 0 {
        return Err(DspError::EmptyTaps);
    }
    if taps % factor != 0 {
        return Err(DspError::TapCountNotMultiple { taps, factor });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_one_output_per_factor_inputs() {
        let mut decimator = Decimator::new(&[0.25; 8], 4).unwrap();

        let mut outputs = 0;
        for sample in 0..25 {
            if decimator.decimate(sample as f32).is_some() {
                outputs += 1;
            }
        }

        // 25 inputs at M=4: exactly 6 outputs, one sample left staged.
        assert_eq!(outputs, 6);
    }

    #[test]
    fn factor_one_matches_plain_fir() {
        let taps = [1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 8.0];
        let mut decimator = Decimator::new(&taps, 1).unwrap();
        let mut fir = FirFilter::new(&taps).unwrap();

        for sample in 0..32 {
            let x = (sample as f32).sin();
            assert_eq!(decimator.decimate(x), Some(fir.filter(x)));
        }
    }

    #[test]
    fn step_input_walks_toward_tap_sum() {
        // Scenario from the receiver's bring-up notes: taps summing to
        // 21, factor 2, constant ones in.
        let taps = [1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 1.0, 8.0];
        let mut decimator = Decimator::new(&taps, 2).unwrap();

        let mut outputs = Vec::new();
        for _ in 0..16 {
            if let Some(y) = decimator.decimate(1.0) {
                outputs.push(y);
            }
        }

        assert_eq!(outputs.len(), 8);
        assert_eq!(outputs[0], 3.0); // h[0] + h[1]
        for pair in outputs.windows(2) {
            assert!(pair[1] >= pair[0], "step response must be monotone");
        }
        assert_eq!(*outputs.last().unwrap(), 21.0);
    }

    #[test]
    fn mismatched_tap_count_is_rejected() {
        assert!(matches!(
            Decimator::new(&[1.0; 10], 4),
            Err(DspError::TapCountNotMultiple {
                taps: 10,
                factor: 4
            })
        ));
    }

    #[test]
    fn reset_discards_staged_samples() {
        let mut decimator = Decimator::new(&[0.5, 0.5], 2).unwrap();

        decimator.decimate(7.0); // staged, no output yet
        decimator.reset();

        assert_eq!(decimator.decimate(1.0), None);
        assert_eq!(decimator.decimate(1.0), Some(1.0));
    }

    #[test]
    fn q15_variant_tracks_float_variant() {
        // Taps chosen exactly representable in Q15 so only the output
        // rounding differs between the variants.
        let taps = [0.25, 0.125, 0.0625, 0.25, 0.125, 0.0625, 0.0625, 0.0625];
        let mut q15 = DecimatorQ15::from_float_taps(&taps, 4).unwrap();
        let mut float = Decimator::new(&taps, 4).unwrap();

        let mut seed: u32 = 0xdead_beef;
        for _ in 0..256 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let x = (seed >> 17) as i16;

            let got = q15.decimate(x);
            let want = float.decimate(f32::from(x));

            match (got, want) {
                (None, None) => {}
                (Some(g), Some(w)) => {
                    assert!((f32::from(g) - w).abs() <= 2.0);
                }
                _ => panic!("variants disagree on output cadence"),
            }
        }
    }
}
