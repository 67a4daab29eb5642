//! Frequency scanning over the signal-state event stream.
//!
//! The scanner is a consumer of the advisory event ring, not a part of
//! the receive path: it watches the tracker's verdicts and steps the
//! tuner to the next frequency whenever the current one carries nothing
//! (`Noise`) or has just gone quiet (`EndOfSignal`). While a signal is
//! present it parks and lets the operator listen.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use onda_level::SignalEvent;
use tracing::{debug, warn};

use crate::engine::{SharedTuner, lock};
use crate::error::RadioError;
use crate::events::EventRing;

/// A sweep definition: `[start, end]` in `step` increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    /// First frequency of the sweep in hertz.
    pub start_hz: u64,
    /// Last frequency of the sweep in hertz.
    pub end_hz: u64,
    /// Step between sweep frequencies in hertz.
    pub step_hz: u64,
}

impl ScanRange {
    /// Validate the range shape.
    pub fn validate(&self) -> Result<(), RadioError> {
        if self.step_hz == 0 || self.end_hz < self.start_hz {
            return Err(RadioError::InvalidScanRange {
                start: self.start_hz,
                end: self.end_hz,
                step: self.step_hz,
            });
        }
        Ok(())
    }
}

/// How long a blocked scanner waits before rechecking its stop flag.
const WAKEUP_INTERVAL: Duration = Duration::from_millis(500);

/// Verdicts discarded after each retune. Blocks already in flight when
/// the tuner moves still carry the previous frequency; acting on them
/// would step right past an active channel.
const SETTLE_EVENTS: u32 = 2;

/// A running frequency sweep.
pub struct FrequencyScanner {
    thread: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl FrequencyScanner {
    /// Start sweeping. Tunes to `range.start_hz` immediately.
    pub fn start(
        tuner: SharedTuner,
        events: EventRing,
        range: ScanRange,
    ) -> Result<Self, RadioError> {
        range.validate()?;

        lock(&tuner).set_frequency(range.start_hz)?;

        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("onda-scanner".into())
            .spawn(move || {
                let mut current_hz = range.start_hz;
                let mut settle_remaining = 0u32;

                while !thread_stop.load(Ordering::Acquire) {
                    let Some(event) = events.recv_timeout(WAKEUP_INTERVAL) else {
                        continue;
                    };

                    if settle_remaining > 0 {
                        settle_remaining -= 1;
                        continue;
                    }

                    match event {
                        SignalEvent::Noise | SignalEvent::EndOfSignal => {
                            current_hz += range.step_hz;
                            if current_hz > range.end_hz {
                                current_hz = range.start_hz;
                            }

                            debug!(frequency_hz = current_hz, "scanner stepping");
                            if let Err(error) = lock(&tuner).set_frequency(current_hz) {
                                warn!(%error, "scanner retune failed");
                            }
                            settle_remaining = SETTLE_EVENTS;
                        }
                        SignalEvent::StartOfSignal | SignalEvent::SignalPresent => {
                            // Parked on an active frequency.
                        }
                    }
                }
            })?;

        Ok(Self {
            thread: Some(thread),
            stop,
        })
    }

    /// Stop the sweep. Returns within the wakeup interval.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for FrequencyScanner {
    fn drop(&mut self) {
        self.stop();
    }
}
