//! The sample-thread engine.
//!
//! One long-lived thread walks the receive path: read an IQ block from
//! the front-end, gate it through the squelch, feed the level loop, and
//! run the active demodulation chain into the PCM sink. The demodulator
//! is owned by this thread alone; the control plane reaches it only
//! through the command queue, drained at block boundaries - which is
//! what makes mode switches atomic with respect to the signal.
//!
//! Lock ordering: the level state is locked before the tuner (the AGC's
//! gain callbacks take the tuner lock while the level lock is held).
//! Nothing in the crate takes them in the opposite order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use onda_demod::{DemodMode, Demodulator};
use onda_level::{AutomaticGainControl, SignalEvent, Squelch};
use tracing::{error, info, warn};

use crate::events::EventRing;
use crate::tuner::TunerBackend;

/// Shared handle to the tuner front-end.
pub type SharedTuner = Arc<Mutex<Box<dyn TunerBackend>>>;

/// Callback receiving demodulated PCM blocks on the sample thread.
pub type PcmSink = Box<dyn FnMut(&[i16]) + Send>;

/// Callback receiving per-block signal-state events on the sample
/// thread.
pub type SignalStateCallback = Box<dyn FnMut(SignalEvent) + Send>;

/// The block-rate level machinery shared with the control plane.
pub struct LevelState {
    /// The audio gate.
    pub squelch: Squelch,
    /// The gain loop.
    pub agc: AutomaticGainControl,
}

/// Shared handle to the level state.
pub type SharedLevels = Arc<Mutex<LevelState>>;

/// Control-plane requests applied by the sample thread at block
/// boundaries.
#[derive(Debug, Clone, Copy)]
pub enum Command {
    /// Switch the active demodulation chain.
    SetMode(DemodMode),
    /// Adjust one chain's demodulator gain.
    SetDemodGain(DemodMode, f32),
    /// Reconfigure the WBFM de-emphasis time constant in microseconds.
    SetDeemphasisMicros(f32),
}

/// Engine construction parameters.
pub struct EngineConfig {
    /// Bytes per front-end read; one block is half as many IQ pairs.
    pub block_bytes: usize,
    /// Demodulation mode active at startup.
    pub initial_mode: DemodMode,
}

/// A running sample thread.
pub struct Engine {
    thread: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    commands: mpsc::Sender<Command>,
}

/// Consecutive read failures tolerated before the engine gives up on
/// the front-end.
const MAX_READ_FAILURES: u32 = 8;

impl Engine {
    /// Spawn the sample thread.
    pub fn spawn(
        tuner: SharedTuner,
        levels: SharedLevels,
        events: EventRing,
        mut sink: PcmSink,
        mut signal_callback: Option<SignalStateCallback>,
        config: EngineConfig,
    ) -> Result<Self, crate::error::RadioError> {
        let running = Arc::new(AtomicBool::new(true));
        let (command_sender, command_receiver) = mpsc::channel();

        let thread_running = Arc::clone(&running);
        let thread = std::thread::Builder::new()
            .name("onda-sample".into())
            .spawn(move || {
                let mut demodulator = Demodulator::new();
                demodulator.set_mode(config.initial_mode);

                let mut block = vec![0i8; config.block_bytes];
                let mut read_failures: u32 = 0;

                while thread_running.load(Ordering::Acquire) {
                    // Block boundary: apply queued control requests.
                    while let Ok(command) = command_receiver.try_recv() {
                        apply_command(&mut demodulator, command);
                    }

                    let read = lock(&tuner).read_iq(&mut block);

                    let filled = match read {
                        Ok(0) => {
                            info!("front-end stream exhausted; sample thread exiting");
                            break;
                        }
                        Ok(filled) => {
                            read_failures = 0;
                            filled
                        }
                        Err(error) => {
                            read_failures += 1;
                            warn!(%error, attempt = read_failures, "front-end read failed");
                            if read_failures > MAX_READ_FAILURES {
                                error!("front-end unrecoverable; sample thread exiting");
                                break;
                            }
                            continue;
                        }
                    };

                    let chunk = &block[..filled];

                    let (audio_allowed, event) = {
                        let mut levels = lock(&levels);
                        let gain_db = levels.agc.gain_db();
                        let audio_allowed = levels.squelch.run(gain_db, chunk);
                        let event = levels.squelch.last_event();
                        let magnitude = levels.squelch.signal_magnitude();
                        levels.agc.accept(magnitude);
                        (audio_allowed, event)
                    };

                    events.publish(event);
                    if let Some(callback) = signal_callback.as_mut() {
                        callback(event);
                    }

                    if audio_allowed {
                        let pcm = demodulator.accept_iq(chunk);
                        if !pcm.is_empty() {
                            sink(pcm);
                        }
                    }
                }

                thread_running.store(false, Ordering::Release);
            })?;

        Ok(Self {
            thread: Some(thread),
            running,
            commands: command_sender,
        })
    }

    /// Whether the sample thread is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Enqueue a control request for the next block boundary.
    pub fn send(&self, command: Command) {
        // A send failure means the thread already exited; the command
        // is moot.
        let _ = self.commands.send(command);
    }

    /// Signal the thread to stop and wait for it to exit.
    ///
    /// Bounded by the front-end's one-second read contract.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn apply_command(demodulator: &mut Demodulator, command: Command) {
    match command {
        Command::SetMode(mode) => demodulator.set_mode(mode),
        Command::SetDemodGain(mode, gain) => demodulator.set_demod_gain(mode, gain),
        Command::SetDeemphasisMicros(microseconds) => {
            demodulator.wbfm_mut().set_deemphasis_time_constant(microseconds);
        }
    }
}

/// Lock a mutex, riding through poisoning: a panicked holder leaves
/// plain-old-data state that is still safe to reuse.
pub(crate) fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
