//! Onda Radio - the receiver runtime.
//!
//! This crate assembles the DSP, demodulation, and level crates into a
//! running receiver:
//!
//! - [`TunerBackend`] - the front-end seam, with capture-file and
//!   synthesized-signal implementations
//! - [`Radio`] - the control surface owned by the operator's thread
//! - the sample-thread engine, spawned by [`Radio::start`], which walks
//!   IQ blocks through squelch, AGC, and the active demodulation chain
//! - [`EventRing`] - a bounded drop-oldest stream of signal-state
//!   events
//! - [`FrequencyScanner`] - a sweep that steps on noise and parks on
//!   signal
//!
//! # Threading model
//!
//! Two long-lived threads: the *sample thread* (owned by the engine)
//! and the caller's *control thread* operating through [`Radio`].
//! Tuner and level state are mutex-shared; demodulator state belongs
//! exclusively to the sample thread, with control requests applied at
//! block boundaries. A control update observed at block `k` is in
//! effect no later than block `k + 1`.

pub mod engine;
pub mod error;
pub mod events;
pub mod radio;
pub mod scanner;
pub mod tuner;

pub use engine::{PcmSink, SignalStateCallback};
pub use error::RadioError;
pub use events::EventRing;
pub use radio::Radio;
pub use scanner::{FrequencyScanner, ScanRange};
pub use tuner::{FileTuner, Gain, Station, ToneTuner, TunerBackend};
