use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Why the receive path declared the current frame finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryCause {
    /// The bulk engine wrote all programmed bytes contiguously.
    Complete,
    /// The idle timeout expired first: the engine stalled waiting for
    /// bytes that will not come, typically a lost leading byte.
    TimeoutLoss,
}

/// Single-slot hand-off from the peripheral's event context to the consumer.
///
/// Capacity 1 with overwrite-oldest semantics: a publish into an occupied
/// slot replaces the pending cause and bumps the overwrite counter instead
/// of queueing. One producer side (the boundary handlers), one consumer
/// side (the main loop); the consumer blocks instead of spinning.
#[derive(Debug, Default)]
pub struct BoundarySlot {
    pending: Mutex<Option<BoundaryCause>>,
    ready: Condvar,
    overwrites: AtomicU64,
}

impl BoundarySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a boundary, waking the consumer.
    ///
    /// Returns `true` if a previous cause was still pending and got
    /// replaced.
    pub fn publish(&self, cause: BoundaryCause) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let overwrote = pending.replace(cause).is_some();
        if overwrote {
            self.overwrites.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_one();
        overwrote
    }

    /// Take the pending cause without blocking.
    pub fn try_recv(&self) -> Option<BoundaryCause> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }

    /// Block until a boundary arrives or `timeout` elapses.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BoundaryCause> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(cause) = pending.take() {
                return Some(cause);
            }
            let now = std::time::Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, _timeout) = self
                .ready
                .wait_timeout(pending, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            pending = guard;
        }
    }

    /// Boundaries lost to overwrite since creation.
    pub fn overwrites(&self) -> u64 {
        self.overwrites.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn publish_then_recv() {
        let slot = BoundarySlot::new();
        assert!(!slot.publish(BoundaryCause::Complete));
        assert_eq!(
            slot.recv_timeout(Duration::from_millis(10)),
            Some(BoundaryCause::Complete)
        );
        assert_eq!(slot.try_recv(), None);
    }

    #[test]
    fn recv_times_out_when_empty() {
        let slot = BoundarySlot::new();
        assert_eq!(slot.recv_timeout(Duration::from_millis(10)), None);
    }

    #[test]
    fn overwrite_replaces_and_counts() {
        let slot = BoundarySlot::new();
        assert!(!slot.publish(BoundaryCause::TimeoutLoss));
        assert!(slot.publish(BoundaryCause::Complete));
        assert_eq!(slot.overwrites(), 1);
        // newest cause wins
        assert_eq!(slot.try_recv(), Some(BoundaryCause::Complete));
        assert_eq!(slot.try_recv(), None);
    }

    #[test]
    fn wakes_blocked_receiver() {
        let slot = Arc::new(BoundarySlot::new());
        let publisher = Arc::clone(&slot);

        let receiver = std::thread::spawn(move || slot.recv_timeout(Duration::from_secs(5)));
        std::thread::sleep(Duration::from_millis(20));
        publisher.publish(BoundaryCause::TimeoutLoss);

        assert_eq!(
            receiver.join().expect("receiver thread should finish"),
            Some(BoundaryCause::TimeoutLoss)
        );
    }
}
