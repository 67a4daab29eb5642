//! The radio-state object: the receiver's control surface.
//!
//! [`Radio`] ties the pieces together: it owns the shared tuner handle,
//! the level state (squelch and AGC), the sample-thread engine, and the
//! optional frequency scanner. Control-plane calls take effect either
//! immediately (tuner and level operations, which are lock-protected)
//! or at the next block boundary (demodulator operations, which travel
//! through the engine's command queue).

use std::sync::{Arc, Mutex};

use onda_demod::DemodMode;
use onda_level::agc::GainError;
use onda_level::{AutomaticGainControl, MAX_ADJUSTABLE_GAIN_DB, Squelch};
use tracing::info;

use crate::engine::{
    Command, Engine, EngineConfig, LevelState, PcmSink, SharedLevels, SharedTuner,
    SignalStateCallback, lock,
};
use crate::error::RadioError;
use crate::events::EventRing;
use crate::scanner::{FrequencyScanner, ScanRange};
use crate::tuner::{Gain, TunerBackend};

/// Power-on AGC operating point in dBFS.
const DEFAULT_OPERATING_POINT_DBFS: i32 = -12;

/// Power-on squelch threshold: low enough that the gate sits open.
const DEFAULT_SQUELCH_THRESHOLD_DBFS: i32 = -100;

/// Word length of the detector's magnitude estimates over 8-bit IQ.
const DETECTOR_WORD_LENGTH: u32 = 8;

/// Default front-end read size in bytes.
const DEFAULT_BLOCK_BYTES: usize = 16_384;

/// Undelivered signal-state events retained for observers.
const EVENT_RING_CAPACITY: usize = 32;

/// The receiver.
pub struct Radio {
    tuner: SharedTuner,
    levels: SharedLevels,
    events: EventRing,
    engine: Option<Engine>,
    scanner: Option<FrequencyScanner>,
    scan_range: Option<ScanRange>,
    mode: DemodMode,
    block_bytes: usize,
    /// Demodulator settings made before the engine exists, replayed at
    /// start.
    pending_commands: Vec<Command>,
}

impl Radio {
    /// Build a receiver around a tuner front-end.
    pub fn new(tuner: Box<dyn TunerBackend>) -> Result<Self, RadioError> {
        let tuner: SharedTuner = Arc::new(Mutex::new(tuner));

        // The AGC reaches the tuner through capability closures; it
        // never sees the radio object itself.
        let set_tuner = Arc::clone(&tuner);
        let set_gain = Box::new(move |gain_db: u32| {
            lock(&set_tuner)
                .set_gain_db(gain_db)
                .map_err(|error| GainError(error.to_string()))
        });

        let get_tuner = Arc::clone(&tuner);
        let get_gain = Box::new(move || {
            lock(&get_tuner)
                .gain_db()
                .map_err(|error| GainError(error.to_string()))
        });

        let agc = AutomaticGainControl::new(
            DEFAULT_OPERATING_POINT_DBFS,
            DETECTOR_WORD_LENGTH,
            set_gain,
            get_gain,
        )?;

        let levels = Arc::new(Mutex::new(LevelState {
            squelch: Squelch::new(DEFAULT_SQUELCH_THRESHOLD_DBFS),
            agc,
        }));

        Ok(Self {
            tuner,
            levels,
            events: EventRing::new(EVENT_RING_CAPACITY),
            engine: None,
            scanner: None,
            scan_range: None,
            mode: DemodMode::None,
            block_bytes: DEFAULT_BLOCK_BYTES,
            pending_commands: Vec::new(),
        })
    }

    /// Set the front-end read size. Only effective before `start`.
    pub fn set_block_bytes(&mut self, bytes: usize) -> Result<(), RadioError> {
        if self.engine.is_some() {
            return Err(RadioError::AlreadyRunning);
        }
        if bytes == 0 || bytes % 64 != 0 {
            return Err(RadioError::Tuner(
                "block size must be a positive multiple of 64 bytes".into(),
            ));
        }
        self.block_bytes = bytes;
        Ok(())
    }

    /// Start the sample thread, delivering PCM to `sink`.
    pub fn start(&mut self, sink: PcmSink) -> Result<(), RadioError> {
        self.start_with_signal_callback(sink, None)
    }

    /// Start the sample thread with an additional per-block
    /// signal-state callback.
    pub fn start_with_signal_callback(
        &mut self,
        sink: PcmSink,
        signal_callback: Option<SignalStateCallback>,
    ) -> Result<(), RadioError> {
        if self.engine.is_some() {
            return Err(RadioError::AlreadyRunning);
        }

        let engine = Engine::spawn(
            Arc::clone(&self.tuner),
            Arc::clone(&self.levels),
            self.events.clone(),
            sink,
            signal_callback,
            EngineConfig {
                block_bytes: self.block_bytes,
                initial_mode: self.mode,
            },
        )?;

        for command in self.pending_commands.drain(..) {
            engine.send(command);
        }

        info!(mode = %self.mode, block_bytes = self.block_bytes, "receiver started");
        self.engine = Some(engine);
        Ok(())
    }

    /// Stop the scanner and the sample thread.
    pub fn stop(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.stop();
        }
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
            info!("receiver stopped");
        }
    }

    /// Whether the sample thread is alive.
    pub fn is_running(&self) -> bool {
        self.engine.as_ref().is_some_and(Engine::is_running)
    }

    /// A handle to the signal-state event stream.
    pub fn events(&self) -> EventRing {
        self.events.clone()
    }

    // ----- front-end operations ------------------------------------

    /// Tune to `frequency_hz`.
    pub fn set_frequency(&mut self, frequency_hz: u64) -> Result<(), RadioError> {
        lock(&self.tuner).set_frequency(frequency_hz)
    }

    /// The tuned frequency in hertz.
    pub fn frequency(&self) -> u64 {
        lock(&self.tuner).frequency()
    }

    /// Set the front-end sample rate.
    pub fn set_sample_rate(&mut self, samples_per_second: u32) -> Result<(), RadioError> {
        lock(&self.tuner).set_sample_rate(samples_per_second)
    }

    /// The front-end sample rate.
    pub fn sample_rate(&self) -> u32 {
        lock(&self.tuner).sample_rate()
    }

    /// Set the front-end bandwidth.
    pub fn set_bandwidth(&mut self, bandwidth_hz: u32) -> Result<(), RadioError> {
        lock(&self.tuner).set_bandwidth(bandwidth_hz)
    }

    /// The front-end bandwidth.
    pub fn bandwidth(&self) -> u32 {
        lock(&self.tuner).bandwidth()
    }

    /// Apply a frequency-correction factor.
    pub fn set_warp_ppm(&mut self, ppm: i32) -> Result<(), RadioError> {
        lock(&self.tuner).set_warp_ppm(ppm)
    }

    /// Set the IF gain, or hand it to the AGC.
    ///
    /// A manual gain disables the AGC first so the loop cannot fight
    /// the operator's choice.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), RadioError> {
        match gain {
            Gain::Db(gain_db) => {
                if gain_db > MAX_ADJUSTABLE_GAIN_DB {
                    return Err(RadioError::Tuner(format!(
                        "gain {gain_db} dB exceeds the tuner's {MAX_ADJUSTABLE_GAIN_DB} dB range"
                    )));
                }
                lock(&self.levels).agc.disable();
                lock(&self.tuner).set_gain_db(gain_db)
            }
            Gain::Auto => {
                lock(&self.levels).agc.enable();
                Ok(())
            }
        }
    }

    /// The tuner's IF gain in decibels.
    pub fn gain_db(&self) -> Result<u32, RadioError> {
        lock(&self.tuner).gain_db()
    }

    // ----- demodulator operations ----------------------------------

    /// Select the demodulation mode. Applied at the next block
    /// boundary; the chain being left is reset.
    pub fn set_mode(&mut self, mode: DemodMode) {
        self.mode = mode;
        self.send_or_queue(Command::SetMode(mode));
    }

    /// The selected demodulation mode.
    pub fn mode(&self) -> DemodMode {
        self.mode
    }

    /// Set one chain's demodulator gain.
    pub fn set_demod_gain(&mut self, mode: DemodMode, gain: f32) {
        self.send_or_queue(Command::SetDemodGain(mode, gain));
    }

    /// Set the WBFM de-emphasis time constant in microseconds.
    pub fn set_deemphasis_micros(&mut self, microseconds: f32) {
        self.send_or_queue(Command::SetDeemphasisMicros(microseconds));
    }

    fn send_or_queue(&mut self, command: Command) {
        if let Some(engine) = &self.engine {
            engine.send(command);
        } else {
            self.pending_commands.push(command);
        }
    }

    // ----- AGC operations ------------------------------------------

    /// Enable the gain loop.
    pub fn agc_enable(&mut self) -> bool {
        lock(&self.levels).agc.enable()
    }

    /// Disable the gain loop.
    pub fn agc_disable(&mut self) -> bool {
        lock(&self.levels).agc.disable()
    }

    /// Whether the gain loop is running.
    pub fn agc_is_enabled(&self) -> bool {
        lock(&self.levels).agc.is_enabled()
    }

    /// Set the AGC operating point in dBFS.
    pub fn agc_set_operating_point(&mut self, dbfs: i32) -> Result<(), RadioError> {
        Ok(lock(&self.levels).agc.set_operating_point(dbfs)?)
    }

    /// Set the AGC deadband in decibels.
    pub fn agc_set_deadband(&mut self, deadband_db: u32) -> Result<(), RadioError> {
        Ok(lock(&self.levels).agc.set_deadband(deadband_db)?)
    }

    /// Set the AGC filter coefficient.
    pub fn agc_set_alpha(&mut self, alpha: f32) -> Result<(), RadioError> {
        Ok(lock(&self.levels).agc.set_alpha(alpha)?)
    }

    /// Set the AGC blanking limit in ticks.
    pub fn agc_set_blanking(&mut self, ticks: u32) -> Result<(), RadioError> {
        Ok(lock(&self.levels).agc.set_blanking_limit(ticks)?)
    }

    // ----- squelch operations --------------------------------------

    /// Set the squelch threshold in dBFS.
    pub fn set_squelch_threshold(&mut self, threshold_dbfs: i32) {
        lock(&self.levels).squelch.set_threshold(threshold_dbfs);
    }

    /// The squelch threshold in dBFS.
    pub fn squelch_threshold(&self) -> i32 {
        lock(&self.levels).squelch.threshold()
    }

    /// Return the squelch tracker to its idle state.
    pub fn reset_squelch(&mut self) {
        lock(&self.levels).squelch.reset();
    }

    /// Average magnitude of the most recent block, for display.
    pub fn signal_magnitude(&self) -> u32 {
        lock(&self.levels).squelch.signal_magnitude()
    }

    // ----- scanner operations --------------------------------------

    /// Define the scanner sweep.
    pub fn set_scan_range(
        &mut self,
        start_hz: u64,
        end_hz: u64,
        step_hz: u64,
    ) -> Result<(), RadioError> {
        let range = ScanRange {
            start_hz,
            end_hz,
            step_hz,
        };
        range.validate()?;
        self.scan_range = Some(range);
        Ok(())
    }

    /// Start sweeping the configured range.
    pub fn start_scan(&mut self) -> Result<(), RadioError> {
        if self.scanner.is_some() {
            return Err(RadioError::AlreadyRunning);
        }
        let range = self.scan_range.ok_or(RadioError::NoScanRange)?;

        let scanner =
            FrequencyScanner::start(Arc::clone(&self.tuner), self.events.clone(), range)?;
        self.scanner = Some(scanner);
        info!(
            start_hz = range.start_hz,
            end_hz = range.end_hz,
            step_hz = range.step_hz,
            "scanner started"
        );
        Ok(())
    }

    /// Stop the sweep, leaving the tuner where it parked.
    pub fn stop_scan(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.stop();
            info!("scanner stopped");
        }
    }
}

impl Drop for Radio {
    fn drop(&mut self) {
        self.stop();
    }
}
