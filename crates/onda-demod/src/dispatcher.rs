//! Mode dispatch over the demodulation chains.
//!
//! The receiver owns one instance of every chain and forwards IQ blocks
//! to the active one. Switching modes resets the chain being left so
//! that stale pipeline contents never bleed into a later session on the
//! same mode.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::am::AmDemodulator;
use crate::fm::FmDemodulator;
use crate::ssb::{Sideband, SsbDemodulator};
use crate::wbfm::WbFmDemodulator;

/// Demodulation mode selected by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DemodMode {
    /// Envelope detection.
    Am,
    /// Narrow-band frequency demodulation.
    Fm,
    /// Wide-band frequency demodulation with de-emphasis.
    WbFm,
    /// Lower-sideband SSB.
    SsbLsb,
    /// Upper-sideband SSB.
    SsbUsb,
    /// No demodulation; IQ blocks are consumed and discarded.
    #[default]
    None,
}

impl fmt::Display for DemodMode {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DemodMode::Am => "am",
            DemodMode::Fm => "fm",
            DemodMode::WbFm => "wbfm",
            DemodMode::SsbLsb => "lsb",
            DemodMode::SsbUsb => "usb",
            DemodMode::None => "none",
        };
        formatter.write_str(name)
    }
}

/// Error for unrecognized mode names.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown demodulation mode '{0}'")]
pub struct ModeParseError(pub String);

impl FromStr for DemodMode {
    type Err = ModeParseError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "am" => Ok(DemodMode::Am),
            "fm" => Ok(DemodMode::Fm),
            "wbfm" => Ok(DemodMode::WbFm),
            "lsb" | "ssb-lsb" => Ok(DemodMode::SsbLsb),
            "usb" | "ssb-usb" => Ok(DemodMode::SsbUsb),
            "none" => Ok(DemodMode::None),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

/// The receiver's demodulator: all chains, one active.
pub struct Demodulator {
    mode: DemodMode,
    am: AmDemodulator,
    fm: FmDemodulator,
    wbfm: WbFmDemodulator,
    ssb: SsbDemodulator,
}

impl Demodulator {
    /// Create a demodulator with no active chain.
    pub fn new() -> Self {
        Self {
            mode: DemodMode::None,
            am: AmDemodulator::new(),
            fm: FmDemodulator::new(),
            wbfm: WbFmDemodulator::new(),
            ssb: SsbDemodulator::new(Sideband::Lower),
        }
    }

    /// The active mode.
    pub fn mode(&self) -> DemodMode {
        self.mode
    }

    /// Switch the active chain.
    ///
    /// The chain being left is reset. The caller (the sample-thread
    /// engine) guarantees this happens between blocks, which is what
    /// makes the switch atomic from the signal's point of view.
    pub fn set_mode(&mut self, mode: DemodMode) {
        if mode == self.mode {
            // Still worth updating the sideband: lsb -> usb is a mode
            // switch in the operator's eyes but reuses the same chain.
            self.apply_sideband(mode);
            return;
        }

        self.reset_chain(self.mode);
        debug!(from = %self.mode, to = %mode, "demodulator mode switch");
        self.mode = mode;
        self.apply_sideband(mode);
    }

    fn apply_sideband(&mut self, mode: DemodMode) {
        match mode {
            DemodMode::SsbLsb => self.ssb.set_sideband(Sideband::Lower),
            DemodMode::SsbUsb => self.ssb.set_sideband(Sideband::Upper),
            _ => {}
        }
    }

    fn reset_chain(&mut self, mode: DemodMode) {
        match mode {
            DemodMode::Am => self.am.reset(),
            DemodMode::Fm => self.fm.reset(),
            DemodMode::WbFm => self.wbfm.reset(),
            DemodMode::SsbLsb | DemodMode::SsbUsb => self.ssb.reset(),
            DemodMode::None => {}
        }
    }

    /// Set the demodulator gain of one chain without activating it.
    pub fn set_demod_gain(&mut self, mode: DemodMode, gain: f32) {
        match mode {
            DemodMode::Am => self.am.set_demod_gain(gain),
            DemodMode::Fm => self.fm.set_demod_gain(gain),
            DemodMode::WbFm => self.wbfm.set_demod_gain(gain),
            DemodMode::SsbLsb | DemodMode::SsbUsb => self.ssb.set_demod_gain(gain),
            DemodMode::None => {}
        }
    }

    /// The demodulator gain of one chain.
    pub fn demod_gain(&self, mode: DemodMode) -> f32 {
        match mode {
            DemodMode::Am => self.am.demod_gain(),
            DemodMode::Fm => self.fm.demod_gain(),
            DemodMode::WbFm => self.wbfm.demod_gain(),
            DemodMode::SsbLsb | DemodMode::SsbUsb => self.ssb.demod_gain(),
            DemodMode::None => 0.0,
        }
    }

    /// Access the wide-band FM chain for de-emphasis configuration.
    pub fn wbfm_mut(&mut self) -> &mut WbFmDemodulator {
        &mut self.wbfm
    }

    /// Demodulate one block with the active chain.
    ///
    /// Returns an empty slice in [`DemodMode::None`].
    pub fn accept_iq(&mut self, block: &[i8]) -> &[i16] {
        match self.mode {
            DemodMode::Am => self.am.accept_iq(block),
            DemodMode::Fm => self.fm.accept_iq(block),
            DemodMode::WbFm => self.wbfm.accept_iq(block),
            DemodMode::SsbLsb | DemodMode::SsbUsb => self.ssb.accept_iq(block),
            DemodMode::None => &[],
        }
    }

    /// Reset the active chain.
    pub fn reset(&mut self) {
        self.reset_chain(self.mode);
    }
}

impl Default for Demodulator {
    fn default() -> Self {
        Self::new()
    }
}
