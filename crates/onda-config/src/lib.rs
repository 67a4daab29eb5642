//! Configuration for the onda SDR receiver.
//!
//! Receiver settings - frequency, mode, gain, AGC and squelch tunables,
//! scanner range - are stored as TOML files and validated before use.
//!
//! # Example
//!
//! ```rust,no_run
//! use onda_config::{ReceiverConfig, validate_config};
//!
//! let config = ReceiverConfig::load("receiver.toml").unwrap();
//! validate_config(&config).unwrap();
//! ```

mod error;
mod receiver;

/// Configuration validation.
pub mod validation;

pub use error::ConfigError;
pub use receiver::{
    AgcConfig, DemodGainConfig, ReceiverConfig, ScannerConfig, SquelchConfig,
};
pub use validation::{ValidationError, ValidationResult, validate_config};
