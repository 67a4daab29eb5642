//! Error type for primitive construction.
//!
//! The processing methods of every filter in this crate are total: once a
//! filter is built it cannot fail at runtime. All validation happens here,
//! at construction.

use thiserror::Error;

/// Errors reported by filter constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DspError {
    /// A filter was constructed with an empty coefficient slice.
    #[error("filter requires at least one tap")]
    EmptyTaps,

    /// A rate factor of zero was supplied.
    #[error("rate-change factor must be at least 1")]
    ZeroFactor,

    /// The tap count does not divide evenly by the rate-change factor.
    ///
    /// The commutated decimator and the polyphase interpolator both
    /// partition their taps into `factor`-sized groups, so the tap count
    /// must be an exact multiple of the factor.
    #[error("{taps} taps cannot be partitioned by factor {factor}")]
    TapCountNotMultiple {
        /// Number of taps supplied.
        taps: usize,
        /// Offending rate-change factor.
        factor: usize,
    },

    /// A Q15 coefficient outside [-1, 1) was supplied.
    #[error("tap {index} is outside the Q15 range [-1, 1)")]
    TapOutOfQ15Range {
        /// Index of the offending tap in the coefficient slice.
        index: usize,
    },

    /// A dBFS word length outside [1, 31] bits was supplied.
    #[error("word length of {bits} bits is outside [1, 31]")]
    InvalidWordLength {
        /// Offending word length.
        bits: u32,
    },
}
