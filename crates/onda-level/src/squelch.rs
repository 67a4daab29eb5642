//! Audio gating by signal presence.
//!
//! The squelch composes a [`SignalDetector`] with a [`SignalTracker`].
//! Audio is allowed through from the start of a signal up to and
//! including the block on which it ends - the `EndOfSignal` block still
//! passes, giving a one-block tail that avoids clipping the end of a
//! transmission.

use crate::detector::SignalDetector;
use crate::tracker::{SignalEvent, SignalTracker};

/// Signal-presence gate for the audio path.
pub struct Squelch {
    detector: SignalDetector,
    tracker: SignalTracker,
    last_event: SignalEvent,
}

impl Squelch {
    /// Create a squelch with the given detection threshold in dBFS.
    pub fn new(threshold_dbfs: i32) -> Self {
        Self {
            detector: SignalDetector::new(threshold_dbfs),
            tracker: SignalTracker::new(),
            last_event: SignalEvent::Noise,
        }
    }

    /// Update the detection threshold; takes effect on the next block.
    pub fn set_threshold(&mut self, threshold_dbfs: i32) {
        self.detector.set_threshold(threshold_dbfs);
    }

    /// The current detection threshold in dBFS.
    pub fn threshold(&self) -> i32 {
        self.detector.threshold()
    }

    /// Average magnitude of the last processed block, for display.
    pub fn signal_magnitude(&self) -> u32 {
        self.detector.signal_magnitude()
    }

    /// The tracker event produced by the last [`run`](Self::run) call.
    ///
    /// Observers (scanner, UI) read signal state here instead of holding
    /// a reference into the tracker.
    pub fn last_event(&self) -> SignalEvent {
        self.last_event
    }

    /// Gate one block: returns true when audio should pass.
    pub fn run(&mut self, gain_db: u32, block: &[i8]) -> bool {
        let present = self.detector.detect(block, gain_db);
        let event = self.tracker.run(present);
        self.last_event = event;

        match event {
            SignalEvent::StartOfSignal | SignalEvent::SignalPresent | SignalEvent::EndOfSignal => {
                true
            }
            SignalEvent::Noise => false,
        }
    }

    /// Return the tracker to its idle state.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.last_event = SignalEvent::Noise;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_of(i: i8, pairs: usize) -> Vec<i8> {
        let mut block = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            block.push(i);
            block.push(0);
        }
        block
    }

    #[test]
    fn opens_on_signal_and_closes_after_tail() {
        let mut squelch = Squelch::new(-20);

        let loud = block_of(100, 64);
        let quiet = block_of(2, 64);

        assert!(!squelch.run(0, &quiet)); // noise
        assert!(squelch.run(0, &loud)); // start of signal
        assert!(squelch.run(0, &loud)); // signal present
        assert!(squelch.run(0, &quiet)); // end of signal: one-block tail
        assert!(!squelch.run(0, &quiet)); // closed
    }

    #[test]
    fn exposes_tracker_events_to_observers() {
        let mut squelch = Squelch::new(-20);

        squelch.run(0, &block_of(100, 64));
        assert_eq!(squelch.last_event(), SignalEvent::StartOfSignal);

        squelch.run(0, &block_of(2, 64));
        assert_eq!(squelch.last_event(), SignalEvent::EndOfSignal);
    }

    #[test]
    fn reset_closes_the_gate() {
        let mut squelch = Squelch::new(-20);

        squelch.run(0, &block_of(100, 64));
        squelch.reset();

        assert_eq!(squelch.last_event(), SignalEvent::Noise);
        // A quiet block after reset is plain noise, not an end of
        // signal.
        assert!(!squelch.run(0, &block_of(2, 64)));
    }
}
