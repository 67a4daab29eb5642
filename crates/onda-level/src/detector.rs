//! Block-averaged signal detection.
//!
//! The detector consumes raw interleaved IQ bytes, estimates the
//! magnitude of every sample pair, averages over the block, and compares
//! the average - referenced back to the antenna port by subtracting the
//! tuner gain - against a dBFS threshold.

use onda_dsp::{DbfsCalculator, magnitude_estimate_i8};

/// Magnitude word length of an 8-bit tuner front-end.
///
/// The Robertson estimate of a full-scale i8 pair reaches 192, so the
/// magnitudes fit an 8-bit word.
const MAGNITUDE_WORD_LENGTH: u32 = 8;

/// Threshold detector over blocks of interleaved 8-bit IQ samples.
pub struct SignalDetector {
    threshold_dbfs: i32,
    dbfs: DbfsCalculator,
    /// Block average of the most recent detect call, kept for display.
    signal_magnitude: u32,
}

impl SignalDetector {
    /// Create a detector with the given dBFS threshold.
    pub fn new(threshold_dbfs: i32) -> Self {
        Self {
            threshold_dbfs,
            // The 8-bit word length is always valid.
            dbfs: DbfsCalculator::new(MAGNITUDE_WORD_LENGTH).expect("8-bit word length"),
            signal_magnitude: 0,
        }
    }

    /// Update the detection threshold; takes effect on the next block.
    pub fn set_threshold(&mut self, threshold_dbfs: i32) {
        self.threshold_dbfs = threshold_dbfs;
    }

    /// The current detection threshold in dBFS.
    pub fn threshold(&self) -> i32 {
        self.threshold_dbfs
    }

    /// Average magnitude of the last block, for display.
    pub fn signal_magnitude(&self) -> u32 {
        self.signal_magnitude
    }

    /// Decide whether `block` carries a signal.
    ///
    /// `gain_db` is the tuner gain in effect while the block was
    /// captured; subtracting it references the measured level to the
    /// antenna port so the threshold means the same thing at every gain
    /// setting.
    pub fn detect(&mut self, block: &[i8], gain_db: u32) -> bool {
        let pairs = block.len() / 2;
        if pairs == 0 {
            return false;
        }

        let mut accumulator: u64 = 0;
        for pair in block.chunks_exact(2) {
            accumulator += u64::from(magnitude_estimate_i8(pair[0], pair[1]));
        }

        let average = (accumulator / pairs as u64) as u32;
        self.signal_magnitude = average;

        let signal_dbfs = self.dbfs.magnitude_to_dbfs(average) - gain_db as i32;

        signal_dbfs >= self.threshold_dbfs
    }
}
