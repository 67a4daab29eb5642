//! Error type for level-subsystem configuration.

use thiserror::Error;

/// Rejections from the atomic tunable setters.
///
/// A rejected setter leaves the previous value in place.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum LevelError {
    /// AGC operating point outside [-60, 0] dBFS.
    #[error("operating point {0} dBFS is outside [-60, 0]")]
    OperatingPointOutOfRange(i32),

    /// AGC filter coefficient outside (0.001, 0.999).
    #[error("filter coefficient {0} is outside (0.001, 0.999)")]
    AlphaOutOfRange(f32),

    /// AGC deadband outside [0, 10] dB.
    #[error("deadband of {0} dB is outside [0, 10]")]
    DeadbandOutOfRange(u32),

    /// AGC blanking limit outside [0, 10] ticks.
    #[error("blanking limit of {0} ticks is outside [0, 10]")]
    BlankingLimitOutOfRange(u32),

    /// Magnitude word length rejected by the dBFS calculator.
    #[error("magnitude word length of {0} bits is invalid")]
    InvalidMagnitudeWordLength(u32),
}
