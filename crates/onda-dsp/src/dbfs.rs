//! Magnitude to dBFS conversion via a scaled-log lookup table.
//!
//! The feedback loops (AGC, signal detector) work in decibels referenced
//! to full scale so the control math is linear. Converting magnitudes at
//! block rate with `log10` would be wasteful; instead a 257-entry table
//! covers magnitudes up to 256, and larger magnitudes are halved toward
//! the table while accumulating 6 dB per halving.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::DspError;

/// Largest magnitude resolved directly by the lookup table.
const MAX_LOOKUP_INDEX: u32 = 256;

/// Largest supported word length in bits.
const MAX_WORD_LENGTH: u32 = 31;

/// Converts linear signal magnitudes to decibels below full scale.
///
/// Full scale is `2^w - 1` for the configured word length `w`; every
/// legal magnitude maps to a value of at most 0 dBFS.
///
/// # Example
///
/// ```rust
/// use onda_dsp::DbfsCalculator;
///
/// let calculator = DbfsCalculator::new(7).unwrap();
/// assert_eq!(calculator.magnitude_to_dbfs(127), 0);
/// assert_eq!(calculator.magnitude_to_dbfs(1), -42);
/// ```
#[derive(Debug, Clone)]
pub struct DbfsCalculator {
    full_scale: u32,
    full_scale_db: i32,
    db_table: Vec<i32>,
}

impl DbfsCalculator {
    /// Create a calculator for a `word_length`-bit magnitude.
    ///
    /// Word lengths above 31 bits are clipped to 31.
    ///
    /// # Errors
    ///
    /// Returns [`DspError::InvalidWordLength`] for a zero word length.
    pub fn new(word_length: u32) -> Result<Self, DspError> {
        if word_length == 0 {
            return Err(DspError::InvalidWordLength { bits: word_length });
        }

        let word_length = word_length.min(MAX_WORD_LENGTH);
        let full_scale = (1u32 << word_length) - 1;
        let full_scale_db = (20.0 * libm::log10(f64::from(full_scale))) as i32;

        let mut db_table = Vec::with_capacity(MAX_LOOKUP_INDEX as usize + 1);
        db_table.push(0); // placeholder for index 0
        for magnitude in 1..=MAX_LOOKUP_INDEX {
            db_table.push((20.0 * libm::log10(f64::from(magnitude))) as i32);
        }

        // Index 0 borrows index 1's value rather than representing
        // negative infinity.
        db_table[0] = db_table[1];

        Ok(Self {
            full_scale,
            full_scale_db,
            db_table,
        })
    }

    /// The full-scale magnitude, `2^w - 1`.
    pub fn full_scale(&self) -> u32 {
        self.full_scale
    }

    /// Convert a magnitude to decibels referenced to full scale.
    ///
    /// Magnitudes above full scale are clipped to it, so the result is
    /// never positive.
    pub fn magnitude_to_dbfs(&self, magnitude: u32) -> i32 {
        let mut magnitude = magnitude.min(self.full_scale);

        // Fold the magnitude into table range; each halving costs 6 dB.
        let mut overhead_db = 0;
        while magnitude > MAX_LOOKUP_INDEX {
            magnitude /= 2;
            overhead_db += 6;
        }

        self.db_table[magnitude as usize] + overhead_db - self.full_scale_db
    }
}
