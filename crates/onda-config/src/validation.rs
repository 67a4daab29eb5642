//! Receiver configuration validation.
//!
//! Collects *every* violation in a file rather than stopping at the
//! first, so an operator can fix a config in one pass.

use thiserror::Error;

use crate::receiver::ReceiverConfig;

/// Mode names the receiver accepts.
const KNOWN_MODES: [&str; 6] = ["am", "fm", "wbfm", "lsb", "usb", "none"];

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Unknown demodulation mode name.
    #[error("unknown mode '{0}' (expected am, fm, wbfm, lsb, usb, or none)")]
    UnknownMode(String),

    /// Gain string is neither "auto" nor a decibel number.
    #[error("gain must be 'auto' or a decibel value, got '{0}'")]
    InvalidGain(String),

    /// Gain exceeds the tuner range.
    #[error("gain {0} dB exceeds the tuner's 46 dB range")]
    GainOutOfRange(u32),

    /// Sample rate is not a usable front-end rate.
    #[error("sample rate {0} S/s is not a positive multiple of 256000")]
    InvalidSampleRate(u32),

    /// AGC operating point outside [-60, 0] dBFS.
    #[error("AGC operating point {0} dBFS is outside [-60, 0]")]
    OperatingPointOutOfRange(i32),

    /// AGC alpha outside (0.001, 0.999).
    #[error("AGC alpha {0} is outside (0.001, 0.999)")]
    AlphaOutOfRange(f32),

    /// AGC deadband outside [0, 10] dB.
    #[error("AGC deadband {0} dB is outside [0, 10]")]
    DeadbandOutOfRange(u32),

    /// AGC blanking limit outside [0, 10] ticks.
    #[error("AGC blanking limit {0} is outside [0, 10] ticks")]
    BlankingOutOfRange(u32),

    /// Demodulator gain must be positive.
    #[error("demodulator gain {gain} for mode '{mode}' must be positive and finite")]
    InvalidDemodGain {
        /// Mode the gain was configured for.
        mode: String,
        /// The rejected value.
        gain: f32,
    },

    /// Scanner range malformed.
    #[error("scan range start {start} Hz, end {end} Hz, step {step} Hz is malformed")]
    InvalidScanRange {
        /// Sweep start frequency in hertz.
        start: u64,
        /// Sweep end frequency in hertz.
        end: u64,
        /// Sweep step in hertz.
        step: u64,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a full receiver configuration.
///
/// Returns `Ok(())` when the config is usable, a single error when one
/// field is wrong, and [`ValidationError::Multiple`] otherwise.
pub fn validate_config(config: &ReceiverConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if !KNOWN_MODES.contains(&config.mode.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownMode(config.mode.clone()));
    }

    match config.gain_db() {
        Ok(Some(gain_db)) if gain_db > 46 => {
            errors.push(ValidationError::GainOutOfRange(gain_db));
        }
        Ok(_) => {}
        Err(error) => errors.push(error),
    }

    if config.sample_rate == 0 || config.sample_rate % 256_000 != 0 {
        errors.push(ValidationError::InvalidSampleRate(config.sample_rate));
    }

    if !(-60..=0).contains(&config.agc.operating_point_dbfs) {
        errors.push(ValidationError::OperatingPointOutOfRange(
            config.agc.operating_point_dbfs,
        ));
    }
    if !(config.agc.alpha > 0.001 && config.agc.alpha < 0.999) {
        errors.push(ValidationError::AlphaOutOfRange(config.agc.alpha));
    }
    if config.agc.deadband_db > 10 {
        errors.push(ValidationError::DeadbandOutOfRange(config.agc.deadband_db));
    }
    if config.agc.blanking_limit > 10 {
        errors.push(ValidationError::BlankingOutOfRange(config.agc.blanking_limit));
    }

    for override_entry in &config.demod_gains {
        if !KNOWN_MODES.contains(&override_entry.mode.to_ascii_lowercase().as_str()) {
            errors.push(ValidationError::UnknownMode(override_entry.mode.clone()));
        }
        if !(override_entry.gain.is_finite() && override_entry.gain > 0.0) {
            errors.push(ValidationError::InvalidDemodGain {
                mode: override_entry.mode.clone(),
                gain: override_entry.gain,
            });
        }
    }

    if let Some(scanner) = &config.scanner
        && (scanner.step_hz == 0 || scanner.end_hz < scanner.start_hz)
    {
        errors.push(ValidationError::InvalidScanRange {
            start: scanner.start_hz,
            end: scanner.end_hz,
            step: scanner.step_hz,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else if errors.len() == 1 {
        Err(errors.remove(0))
    } else {
        Err(ValidationError::Multiple(errors))
    }
}
