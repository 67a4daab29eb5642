//! Bounded signal-state event channel.
//!
//! The sample thread publishes one [`SignalEvent`] per block; the
//! scanner and any UI consume them at their own pace. The events are
//! advisory - a missed one is recovered by the next block - so the ring
//! drops its *oldest* entry on overflow rather than blocking the sample
//! thread or growing without bound.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use onda_level::SignalEvent;

struct Shared {
    queue: Mutex<VecDeque<SignalEvent>>,
    available: Condvar,
    capacity: usize,
}

/// A bounded drop-oldest queue of signal-state events.
///
/// Cloning shares the underlying ring; any clone may publish or
/// receive.
#[derive(Clone)]
pub struct EventRing {
    shared: Arc<Shared>,
}

impl EventRing {
    /// Create a ring holding at most `capacity` undelivered events.
    pub fn new(capacity: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
                available: Condvar::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Publish an event, discarding the oldest one if the ring is full.
    /// Never blocks.
    pub fn publish(&self, event: SignalEvent) {
        let mut queue = lock_queue(&self.shared.queue);
        if queue.len() == self.shared.capacity {
            queue.pop_front();
        }
        queue.push_back(event);
        drop(queue);
        self.shared.available.notify_one();
    }

    /// Wait up to `timeout` for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SignalEvent> {
        let mut queue = lock_queue(&self.shared.queue);

        if let Some(event) = queue.pop_front() {
            return Some(event);
        }

        let (mut queue, _) = self
            .shared
            .available
            .wait_timeout(queue, timeout)
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        queue.pop_front()
    }

    /// Number of undelivered events.
    pub fn len(&self) -> usize {
        lock_queue(&self.shared.queue).len()
    }

    /// Whether the ring is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_queue(
    queue: &Mutex<VecDeque<SignalEvent>>,
) -> std::sync::MutexGuard<'_, VecDeque<SignalEvent>> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn delivers_in_order() {
        let ring = EventRing::new(8);
        ring.publish(SignalEvent::StartOfSignal);
        ring.publish(SignalEvent::SignalPresent);
        ring.publish(SignalEvent::EndOfSignal);

        assert_eq!(
            ring.recv_timeout(Duration::from_millis(10)),
            Some(SignalEvent::StartOfSignal)
        );
        assert_eq!(
            ring.recv_timeout(Duration::from_millis(10)),
            Some(SignalEvent::SignalPresent)
        );
        assert_eq!(
            ring.recv_timeout(Duration::from_millis(10)),
            Some(SignalEvent::EndOfSignal)
        );
    }

    #[test]
    fn overflow_drops_the_oldest() {
        let ring = EventRing::new(2);
        ring.publish(SignalEvent::StartOfSignal);
        ring.publish(SignalEvent::SignalPresent);
        ring.publish(SignalEvent::EndOfSignal);

        assert_eq!(
            ring.recv_timeout(Duration::from_millis(10)),
            Some(SignalEvent::SignalPresent)
        );
        assert_eq!(
            ring.recv_timeout(Duration::from_millis(10)),
            Some(SignalEvent::EndOfSignal)
        );
        assert_eq!(ring.recv_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn timeout_returns_none_when_idle() {
        let ring = EventRing::new(4);
        assert_eq!(ring.recv_timeout(Duration::from_millis(20)), None);
    }

    #[test]
    fn wakes_a_blocked_receiver() {
        let ring = EventRing::new(4);
        let publisher = ring.clone();

        let waiter = thread::spawn(move || ring.recv_timeout(Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(20));
        publisher.publish(SignalEvent::Noise);

        assert_eq!(waiter.join().unwrap(), Some(SignalEvent::Noise));
    }
}
