//! Single-sample FIR filtering over a circular state buffer.
//!
//! The filter keeps its state in a ring so that ingesting a sample is a
//! single store plus an index bump; no state is ever copied. The
//! convolution walks the ring backward from the newest sample:
//!
//! ```text
//! y[n] = sum_{k=0}^{N-1} h[k] * x[n-k]
//! ```
//!
//! with `x[n-k]` resolved as `state[(i - k) mod N]` where `i` is the slot
//! the newest sample was just written to.

#[cfg(not(feature = "std"))]
use alloc::vec;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::DspError;

/// Finite impulse response filter with circular state memory.
///
/// One call to [`filter`](Self::filter) consumes one input sample and
/// produces one output sample in O(N) multiply-accumulates. The
/// coefficient order is conventional: `taps[0]` multiplies the newest
/// sample.
///
/// # Example
///
/// ```rust
/// use onda_dsp::FirFilter;
///
/// let mut fir = FirFilter::new(&[0.5, 0.5]).unwrap();
/// assert_eq!(fir.filter(1.0), 0.5);
/// assert_eq!(fir.filter(0.0), 0.5);
/// assert_eq!(fir.filter(0.0), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct FirFilter {
    taps: Vec<f32>,
    state: Vec<f32>,
    /// Ring slot that receives the next input sample.
    index: usize,
}

impl FirFilter {
    /// Create a filter from its impulse response.
    ///
    /// # Errors
    ///
    /// Returns [`DspError::EmptyTaps`] if `taps` is empty.
    pub fn new(taps: &[f32]) -> Result<Self, DspError> {
        if taps.is_empty() {
            return Err(DspError::EmptyTaps);
        }

        Ok(Self {
            taps: taps.to_vec(),
            state: vec![0.0; taps.len()],
            index: 0,
        })
    }

    /// Number of taps.
    pub fn len(&self) -> usize {
        self.taps.len()
    }

    /// Always false; construction rejects empty tap sets.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Filter one sample.
    ///
    /// Stores `x` as the newest sample and evaluates the convolution sum
    /// against the ring, newest sample first.
    #[inline]
    pub fn filter(&mut self, x: f32) -> f32 {
        self.state[self.index] = x;

        let mut slot = self.index;
        let mut y = 0.0;

        for &tap in &self.taps {
            y += tap * self.state[slot];

            // Walk backward through the ring.
            slot = if slot == 0 {
                self.taps.len() - 1
            } else {
                slot - 1
            };
        }

        self.advance();

        y
    }

    /// Push a sample into the state ring without evaluating the
    /// convolution.
    ///
    /// The commutated decimator uses this to load all but the last sample
    /// of a decimation group, paying for a single convolution per output.
    #[inline]
    pub(crate) fn shift_sample_in(&mut self, x: f32) {
        self.state[self.index] = x;
        self.advance();
    }

    #[inline]
    fn advance(&mut self) {
        self.index += 1;
        if self.index == self.taps.len() {
            self.index = 0;
        }
    }

    /// Zero the state ring and rewind the insertion index.
    pub fn reset(&mut self) {
        self.index = 0;
        for slot in &mut self.state {
            *slot = 0.0;
        }
    }
}
