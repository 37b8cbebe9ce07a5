//! Disposable multi-subscriber event channels.
//!
//! A `Broadcaster` fans values out to every live `Subscription`.
//! Delivery is enqueue-only: `publish` never waits for a subscriber to
//! process a value, so a slow subscriber cannot stall the native-call
//! path that produced the event. There is no replay buffer; a late
//! subscriber sees only values published after it attached.

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

struct Registry<T> {
    senders: Vec<Sender<T>>,
    disposed: bool,
}

/// Multi-subscriber asynchronous event channel.
pub struct Broadcaster<T> {
    registry: Mutex<Registry<T>>,
}

impl<T: Clone + Send + 'static> Broadcaster<T> {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                senders: Vec::new(),
                disposed: false,
            }),
        }
    }

    /// Attach a new subscriber.
    ///
    /// After `dispose`, the returned subscription is already finished:
    /// its receiving calls report a closed stream immediately.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = unbounded();
        let mut registry = self.registry.lock();
        if !registry.disposed {
            registry.senders.push(tx);
        }
        Subscription { receiver: rx }
    }

    /// Deliver `value` to every live subscriber, in publish order per
    /// subscriber. Detached subscribers are pruned as a side effect.
    pub fn publish(&self, value: T) {
        let mut registry = self.registry.lock();
        if registry.disposed {
            return;
        }
        registry
            .senders
            .retain(|tx| tx.send(value.clone()).is_ok());
    }

    /// Detach all subscribers and refuse further publishes. Idempotent.
    pub fn dispose(&self) {
        let mut registry = self.registry.lock();
        registry.disposed = true;
        registry.senders.clear();
    }

    pub fn is_disposed(&self) -> bool {
        self.registry.lock().disposed
    }

    /// Live subscriber count (detached subscribers may still be counted
    /// until the next publish prunes them).
    pub fn subscriber_count(&self) -> usize {
        self.registry.lock().senders.len()
    }
}

impl<T: Clone + Send + 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of a broadcast stream.
///
/// Dropping the subscription detaches it from the broadcaster.
pub struct Subscription<T> {
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Block for the next value; `None` once the stream is finished.
    pub fn recv(&self) -> Option<T> {
        self.receiver.recv().ok()
    }

    /// Wait up to `timeout` for the next value.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<T> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Non-blocking poll.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything currently queued without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}
