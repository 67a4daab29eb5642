//! Receiver configuration file format.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete receiver configuration.
///
/// # TOML Format
///
/// ```toml
/// frequency_hz = 162_550_000
/// sample_rate = 256000
/// bandwidth_hz = 0
/// gain = "auto"
/// warp_ppm = 0
/// mode = "fm"
///
/// [agc]
/// operating_point_dbfs = -12
/// alpha = 0.8
/// deadband_db = 1
/// blanking_limit = 1
///
/// [squelch]
/// threshold_dbfs = -100
///
/// [scanner]
/// start_hz = 162_400_000
/// end_hz = 162_550_000
/// step_hz = 25_000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReceiverConfig {
    /// Tuned frequency in hertz.
    pub frequency_hz: u64,

    /// Front-end sample rate in samples per second.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Front-end bandwidth in hertz; zero selects automatic.
    #[serde(default)]
    pub bandwidth_hz: u32,

    /// IF gain: `"auto"` or a decibel value such as `"24"`.
    #[serde(default = "default_gain")]
    pub gain: String,

    /// Frequency-correction factor in parts per million.
    #[serde(default)]
    pub warp_ppm: i32,

    /// Demodulation mode name: am, fm, wbfm, lsb, usb, or none.
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Per-mode demodulator gain overrides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub demod_gains: Vec<DemodGainConfig>,

    /// Gain loop tunables.
    #[serde(default)]
    pub agc: AgcConfig,

    /// Audio gate tunables.
    #[serde(default)]
    pub squelch: SquelchConfig,

    /// Optional sweep definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner: Option<ScannerConfig>,
}

/// A per-mode demodulator gain override.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DemodGainConfig {
    /// Mode name the gain applies to.
    pub mode: String,
    /// Demodulator gain value.
    pub gain: f32,
}

/// AGC tunables; defaults match the receiver's power-on state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgcConfig {
    /// Operating point in dBFS.
    pub operating_point_dbfs: i32,
    /// Gain-filter coefficient.
    pub alpha: f32,
    /// Deadband in decibels.
    pub deadband_db: u32,
    /// Blanking interval in ticks.
    pub blanking_limit: u32,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            operating_point_dbfs: -12,
            alpha: 0.8,
            deadband_db: 1,
            blanking_limit: 1,
        }
    }
}

/// Squelch tunables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SquelchConfig {
    /// Detection threshold in dBFS.
    pub threshold_dbfs: i32,
}

impl Default for SquelchConfig {
    fn default() -> Self {
        Self {
            threshold_dbfs: -100,
        }
    }
}

/// Scanner sweep definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScannerConfig {
    /// First frequency of the sweep in hertz.
    pub start_hz: u64,
    /// Last frequency of the sweep in hertz.
    pub end_hz: u64,
    /// Step between sweep frequencies in hertz.
    pub step_hz: u64,
}

fn default_sample_rate() -> u32 {
    256_000
}

fn default_gain() -> String {
    "auto".to_string()
}

fn default_mode() -> String {
    "none".to_string()
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 162_550_000,
            sample_rate: default_sample_rate(),
            bandwidth_hz: 0,
            gain: default_gain(),
            warp_ppm: 0,
            mode: default_mode(),
            demod_gains: Vec::new(),
            agc: AgcConfig::default(),
            squelch: SquelchConfig::default(),
            scanner: None,
        }
    }
}

impl ReceiverConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::read_file(path, source))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::write_file(path, source))
    }

    /// Parse the gain field: `Ok(None)` means automatic.
    pub fn gain_db(&self) -> Result<Option<u32>, crate::validation::ValidationError> {
        if self.gain.eq_ignore_ascii_case("auto") {
            return Ok(None);
        }
        self.gain
            .parse::<u32>()
            .map(Some)
            .map_err(|_| crate::validation::ValidationError::InvalidGain(self.gain.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_toml() {
        let config = ReceiverConfig::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: ReceiverConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn sparse_files_inherit_defaults() {
        let parsed: ReceiverConfig = toml::from_str("frequency_hz = 7_200_000").unwrap();

        assert_eq!(parsed.frequency_hz, 7_200_000);
        assert_eq!(parsed.sample_rate, 256_000);
        assert_eq!(parsed.mode, "none");
        assert_eq!(parsed.agc, AgcConfig::default());
    }

    #[test]
    fn load_and_save_round_trip() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("receiver.toml");

        let mut config = ReceiverConfig::default();
        config.mode = "usb".to_string();
        config.scanner = Some(ScannerConfig {
            start_hz: 7_000_000,
            end_hz: 7_300_000,
            step_hz: 500,
        });

        config.save(&path).unwrap();
        let loaded = ReceiverConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn gain_field_parses_auto_and_decibels() {
        let mut config = ReceiverConfig::default();
        assert_eq!(config.gain_db().unwrap(), None);

        config.gain = "28".to_string();
        assert_eq!(config.gain_db().unwrap(), Some(28));

        config.gain = "loud".to_string();
        assert!(config.gain_db().is_err());
    }
}
