//! Signal presence tracking.
//!
//! A two-state machine that turns the detector's per-block boolean into
//! edge events, so downstream consumers (squelch, scanner, UI) can react
//! to signal boundaries instead of polling levels.

/// Per-block output of the [`SignalTracker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// No signal, and none was being tracked.
    Noise,
    /// A signal just appeared.
    StartOfSignal,
    /// The tracked signal is still present.
    SignalPresent,
    /// The tracked signal just vanished.
    EndOfSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackerState {
    NoSignal,
    Tracking,
}

/// Tracks signal presence across blocks.
///
/// Event sequences always match
/// `Noise* (StartOfSignal SignalPresent* EndOfSignal)* Noise*`; in
/// particular every `StartOfSignal` is eventually paired with an
/// `EndOfSignal`, which is what gives the squelch its one-block closing
/// tail.
#[derive(Debug, Clone)]
pub struct SignalTracker {
    state: TrackerState,
}

impl SignalTracker {
    /// Create a tracker in the `NoSignal` state.
    pub fn new() -> Self {
        Self {
            state: TrackerState::NoSignal,
        }
    }

    /// Advance the machine with one block's presence verdict.
    pub fn run(&mut self, signal_is_present: bool) -> SignalEvent {
        match (self.state, signal_is_present) {
            (TrackerState::NoSignal, false) => SignalEvent::Noise,
            (TrackerState::NoSignal, true) => {
                self.state = TrackerState::Tracking;
                SignalEvent::StartOfSignal
            }
            (TrackerState::Tracking, true) => SignalEvent::SignalPresent,
            (TrackerState::Tracking, false) => {
                self.state = TrackerState::NoSignal;
                SignalEvent::EndOfSignal
            }
        }
    }

    /// Force the tracker back to `NoSignal`.
    pub fn reset(&mut self) {
        self.state = TrackerState::NoSignal;
    }
}

impl Default for SignalTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SignalEvent::{EndOfSignal, Noise, SignalPresent, StartOfSignal};

    #[test]
    fn reference_sequence() {
        let mut tracker = SignalTracker::new();

        let inputs = [false, false, true, true, true, false, false, true, false];
        let events: Vec<_> = inputs.iter().map(|&p| tracker.run(p)).collect();

        assert_eq!(
            events,
            vec![
                Noise,
                Noise,
                StartOfSignal,
                SignalPresent,
                SignalPresent,
                EndOfSignal,
                Noise,
                StartOfSignal,
                EndOfSignal,
            ]
        );
    }

    #[test]
    fn reset_abandons_a_tracked_signal() {
        let mut tracker = SignalTracker::new();

        tracker.run(true);
        tracker.reset();

        // No EndOfSignal: the tracked signal was forgotten, not closed.
        assert_eq!(tracker.run(false), Noise);
    }
}
