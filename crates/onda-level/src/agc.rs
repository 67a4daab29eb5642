//! Automatic gain control: the Harris loop.
//!
//! Once per block the receiver hands the AGC the detector's average
//! magnitude. The loop converts it to dBFS, compares against the
//! operating point, lowpass-filters the error into a gain value, and
//! asks the tuner - through a caller-supplied callback - to apply it.
//!
//! Three guards keep the loop from oscillating:
//!
//! - a *deadband*: errors within a small window are ignored
//! - *blanking*: after a gain change, a configurable number of ticks are
//!   skipped so hardware transients settle before the next measurement
//! - *rail clamping*: the error is zeroed when the gain is already
//!   pinned at its limit in the direction the error is pushing
//!
//! The loop tracks the hardware rather than assuming it: each tick reads
//! the gain back, and an externally applied value replaces the tracked
//! one.

use onda_dsp::DbfsCalculator;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::LevelError;

/// Gain range of the reference tuner's IF amplifier in decibels.
pub const MAX_ADJUSTABLE_GAIN_DB: u32 = 46;

/// Failure reported by a tuner gain callback.
#[derive(Debug, Clone, Error)]
#[error("tuner gain access failed: {0}")]
pub struct GainError(pub String);

/// Callback that applies a gain, in decibels, to the tuner hardware.
pub type SetGainFn = Box<dyn FnMut(u32) -> Result<(), GainError> + Send>;

/// Callback that reads the tuner's current gain in decibels.
pub type GetGainFn = Box<dyn FnMut() -> Result<u32, GainError> + Send>;

/// Harris-style automatic gain control.
///
/// Owned by the radio object; the gain callbacks are the only channel to
/// the hardware, so the loop carries no global state and two receivers
/// can run independent loops.
pub struct AutomaticGainControl {
    enabled: bool,

    operating_point_dbfs: i32,
    deadband_db: u32,
    alpha: f32,

    gain_db: u32,
    filtered_gain_db: f32,

    blanking_counter: u32,
    blanking_limit: u32,
    gain_was_adjusted: bool,

    /// Magnitude of the last tick the loop actually processed; ticks
    /// with an unchanged magnitude are skipped.
    signal_magnitude: u32,
    signal_dbfs: i32,
    normalized_dbfs: i32,

    dbfs: DbfsCalculator,
    set_gain: SetGainFn,
    get_gain: GetGainFn,
}

impl AutomaticGainControl {
    /// Create a disabled AGC.
    ///
    /// `magnitude_word_length` is the bit width of the magnitudes that
    /// will be offered to [`accept`](Self::accept); it anchors the dBFS
    /// scale. The callbacks set and read the tuner's IF gain.
    ///
    /// # Errors
    ///
    /// Returns [`LevelError::OperatingPointOutOfRange`] for an operating
    /// point outside [-60, 0] dBFS.
    pub fn new(
        operating_point_dbfs: i32,
        magnitude_word_length: u32,
        set_gain: SetGainFn,
        get_gain: GetGainFn,
    ) -> Result<Self, LevelError> {
        if !(-60..=0).contains(&operating_point_dbfs) {
            return Err(LevelError::OperatingPointOutOfRange(operating_point_dbfs));
        }

        // Power-on defaults of the reference receiver.
        let initial_gain_db = 24;

        Ok(Self {
            enabled: false,
            operating_point_dbfs,
            deadband_db: 1,
            alpha: 0.8,
            gain_db: initial_gain_db,
            filtered_gain_db: initial_gain_db as f32,
            blanking_counter: 0,
            blanking_limit: 1,
            gain_was_adjusted: false,
            signal_magnitude: 0,
            signal_dbfs: -12,
            normalized_dbfs: -(initial_gain_db as i32),
            dbfs: DbfsCalculator::new(magnitude_word_length)
                .map_err(|_| LevelError::InvalidMagnitudeWordLength(magnitude_word_length))?,
            set_gain,
            get_gain,
        })
    }

    /// Enable the loop. Returns false if it was already enabled.
    pub fn enable(&mut self) -> bool {
        if self.enabled {
            return false;
        }
        self.reset_blanking();
        self.enabled = true;
        true
    }

    /// Disable the loop. Returns false if it was already disabled.
    pub fn disable(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.enabled = false;
        true
    }

    /// Whether the loop is running.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set the operating point in dBFS. Atomic: rejected values leave
    /// the previous one in place.
    pub fn set_operating_point(&mut self, dbfs: i32) -> Result<(), LevelError> {
        if !(-60..=0).contains(&dbfs) {
            return Err(LevelError::OperatingPointOutOfRange(dbfs));
        }
        self.operating_point_dbfs = dbfs;
        Ok(())
    }

    /// Set the gain-filter coefficient. Larger values track faster.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), LevelError> {
        if !(alpha > 0.001 && alpha < 0.999) {
            return Err(LevelError::AlphaOutOfRange(alpha));
        }
        self.alpha = alpha;
        Ok(())
    }

    /// Set the deadband in decibels.
    pub fn set_deadband(&mut self, deadband_db: u32) -> Result<(), LevelError> {
        if deadband_db > 10 {
            return Err(LevelError::DeadbandOutOfRange(deadband_db));
        }
        self.deadband_db = deadband_db;
        Ok(())
    }

    /// Set the blanking limit in ticks and restart the blanking system.
    pub fn set_blanking_limit(&mut self, limit: u32) -> Result<(), LevelError> {
        if limit > 10 {
            return Err(LevelError::BlankingLimitOutOfRange(limit));
        }
        self.blanking_limit = limit;
        self.reset_blanking();
        Ok(())
    }

    /// The gain the loop believes the tuner is using, in decibels.
    pub fn gain_db(&self) -> u32 {
        self.gain_db
    }

    /// Signal level of the last processed tick in dBFS, at the ADC.
    pub fn signal_dbfs(&self) -> i32 {
        self.signal_dbfs
    }

    /// Signal level referenced to the antenna port (gain removed).
    pub fn normalized_signal_dbfs(&self) -> i32 {
        self.normalized_dbfs
    }

    /// Offer one block's average magnitude to the loop.
    ///
    /// Does nothing while disabled, and skips ticks whose magnitude
    /// matches the last one processed - a quiet channel costs nothing.
    pub fn accept(&mut self, magnitude: u32) {
        if !self.enabled {
            return;
        }
        if magnitude == self.signal_magnitude {
            return;
        }
        self.run(magnitude);
    }

    fn run(&mut self, magnitude: u32) {
        // Adopt an externally applied gain so the loop never fights the
        // operator.
        match (self.get_gain)() {
            Ok(hardware_gain_db) => {
                if hardware_gain_db != self.gain_db {
                    debug!(
                        tracked = self.gain_db,
                        hardware = hardware_gain_db,
                        "adopting externally set gain"
                    );
                    self.gain_db = hardware_gain_db.min(MAX_ADJUSTABLE_GAIN_DB);
                }
            }
            Err(error) => {
                warn!(%error, "gain readback failed; skipping AGC tick");
                return;
            }
        }

        // Blanking: sit out the configured number of ticks after any
        // adjustment so hardware transients settle.
        if self.gain_was_adjusted {
            if self.blanking_counter < self.blanking_limit {
                self.blanking_counter += 1;
                return;
            }
            self.reset_blanking();
        }

        self.run_harris(magnitude);
    }

    fn run_harris(&mut self, magnitude: u32) {
        self.signal_magnitude = magnitude;

        self.signal_dbfs = self.dbfs.magnitude_to_dbfs(magnitude);
        self.normalized_dbfs = self.signal_dbfs - self.gain_db as i32;

        let mut gain_error = self.operating_point_dbfs - self.signal_dbfs;

        // Rail clamp: no point pushing past either end of the range.
        if self.gain_db == MAX_ADJUSTABLE_GAIN_DB && gain_error > 0 {
            gain_error = 0;
        }
        if self.gain_db == 0 && gain_error < 0 {
            gain_error = 0;
        }

        if gain_error.unsigned_abs() <= self.deadband_db {
            gain_error = 0;
        }

        self.filtered_gain_db += self.alpha * gain_error as f32;
        self.filtered_gain_db = self
            .filtered_gain_db
            .clamp(0.0, MAX_ADJUSTABLE_GAIN_DB as f32);

        self.gain_db = self.filtered_gain_db as u32;

        // Only touch the hardware when something changed.
        if gain_error != 0 {
            match (self.set_gain)(self.gain_db) {
                Ok(()) => {
                    debug!(gain_db = self.gain_db, "AGC adjusted tuner gain");
                    self.gain_was_adjusted = true;
                }
                Err(error) => {
                    warn!(%error, "gain adjustment failed; loop continues");
                }
            }
        }
    }

    fn reset_blanking(&mut self) {
        self.blanking_counter = 0;
        self.gain_was_adjusted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Shared fake tuner gain register.
    fn fake_tuner(initial_gain: u32) -> (Arc<AtomicU32>, SetGainFn, GetGainFn) {
        let register = Arc::new(AtomicU32::new(initial_gain));

        let set_register = Arc::clone(&register);
        let set_gain: SetGainFn = Box::new(move |gain| {
            set_register.store(gain, Ordering::SeqCst);
            Ok(())
        });

        let get_register = Arc::clone(&register);
        let get_gain: GetGainFn = Box::new(move || Ok(get_register.load(Ordering::SeqCst)));

        (register, set_gain, get_gain)
    }

    /// Magnitude that converts to the requested dBFS at a 7-bit word.
    fn magnitude_for_dbfs(dbfs: i32) -> u32 {
        // Full scale for 7 bits is 127 (42 dB); invert the floor-log
        // table approximately.
        let db = (dbfs + 42) as f64;
        (10f64.powf(db / 20.0)).round() as u32
    }

    fn agc_under_test(register_gain: u32) -> (Arc<AtomicU32>, AutomaticGainControl) {
        let (register, set_gain, get_gain) = fake_tuner(register_gain);
        let agc = AutomaticGainControl::new(-12, 7, set_gain, get_gain).unwrap();
        (register, agc)
    }

    /// Drive the loop with a constant antenna level; magnitude at the
    /// ADC follows the gain.
    fn tick(agc: &mut AutomaticGainControl, register: &AtomicU32, antenna_dbfs: i32) {
        let gain = register.load(Ordering::SeqCst) as i32;
        agc.accept(magnitude_for_dbfs(antenna_dbfs + gain));
    }

    #[test]
    fn converges_to_operating_point() {
        // Reference scenario: op -12 dBFS, antenna -30 dBFS, start at
        // 24 dB. Expected settling gain is 18 dB within a deadband.
        let (register, mut agc) = agc_under_test(24);
        agc.enable();

        for _ in 0..10 {
            tick(&mut agc, &register, -30);
        }

        let settled = register.load(Ordering::SeqCst) as i32;
        assert!(
            (17..=19).contains(&settled),
            "gain settled at {settled}, expected 18 +/- 1"
        );
    }

    #[test]
    fn strong_signal_drives_gain_to_zero_rail() {
        let (register, mut agc) = agc_under_test(24);
        agc.enable();

        // Antenna level far above the operating point.
        for _ in 0..60 {
            tick(&mut agc, &register, 20);
        }

        assert_eq!(register.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn weak_signal_drives_gain_to_max_rail() {
        let (register, mut agc) = agc_under_test(24);
        agc.enable();

        // Weak but nonzero: a magnitude of zero would match the loop's
        // initial state and be skipped by the change gate.
        for _ in 0..60 {
            tick(&mut agc, &register, -60);
        }

        assert_eq!(register.load(Ordering::SeqCst), MAX_ADJUSTABLE_GAIN_DB);
    }

    #[test]
    fn disabled_loop_never_touches_the_tuner() {
        let (register, mut agc) = agc_under_test(24);

        for magnitude in [10, 40, 90, 120] {
            agc.accept(magnitude);
        }

        assert_eq!(register.load(Ordering::SeqCst), 24);
    }

    #[test]
    fn adopts_externally_set_gain() {
        let (register, mut agc) = agc_under_test(24);
        agc.enable();

        // Operator cranks the gain behind the loop's back. The antenna
        // level is chosen so the error lands inside the deadband at the
        // new gain, keeping the loop from immediately re-adjusting.
        register.store(40, Ordering::SeqCst);
        tick(&mut agc, &register, -52);

        assert_eq!(agc.gain_db(), 40);
    }

    #[test]
    fn unchanged_magnitude_is_skipped() {
        let (register, mut agc) = agc_under_test(24);
        agc.enable();

        agc.accept(50);
        let after_first = register.load(Ordering::SeqCst);

        // Identical magnitude: the loop must not move again.
        agc.accept(50);
        assert_eq!(register.load(Ordering::SeqCst), after_first);
    }

    #[test]
    fn failed_readback_skips_the_tick() {
        let (register, set_gain, _) = fake_tuner(24);
        let get_gain: GetGainFn =
            Box::new(move || Err(GainError("usb transfer stalled".into())));

        let mut agc = AutomaticGainControl::new(-12, 7, set_gain, get_gain).unwrap();
        agc.enable();

        agc.accept(120);
        assert_eq!(register.load(Ordering::SeqCst), 24);
    }

    #[test]
    fn tunables_are_validated_atomically() {
        let (_, mut agc) = agc_under_test(24);

        assert!(agc.set_operating_point(-61).is_err());
        assert!(agc.set_operating_point(-40).is_ok());

        assert!(agc.set_alpha(1.5).is_err());
        assert!(agc.set_alpha(0.5).is_ok());

        assert!(agc.set_deadband(11).is_err());
        assert!(agc.set_deadband(2).is_ok());

        assert!(agc.set_blanking_limit(11).is_err());
        assert!(agc.set_blanking_limit(0).is_ok());
    }
}
