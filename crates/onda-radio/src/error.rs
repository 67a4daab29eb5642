//! Error types for the radio control surface and front-end boundary.

use thiserror::Error;

/// Errors surfaced by the radio object and its collaborators.
#[derive(Debug, Error)]
pub enum RadioError {
    /// The tuner front-end rejected or failed an operation.
    #[error("tuner front-end error: {0}")]
    Tuner(String),

    /// An I/O operation against the front-end or the host failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A control setter was called with an out-of-range value.
    #[error("rejected configuration: {0}")]
    Level(#[from] onda_level::LevelError),

    /// The scanner range is malformed.
    #[error("invalid scan range: start {start} Hz, end {end} Hz, step {step} Hz")]
    InvalidScanRange {
        /// Sweep start frequency in hertz.
        start: u64,
        /// Sweep end frequency in hertz.
        end: u64,
        /// Sweep step in hertz.
        step: u64,
    },

    /// An operation required a running sample engine.
    #[error("the receiver is not running")]
    NotRunning,

    /// An operation required a stopped sample engine.
    #[error("the receiver is already running")]
    AlreadyRunning,

    /// No scan range was configured before starting the scanner.
    #[error("no scan range configured")]
    NoScanRange,
}
