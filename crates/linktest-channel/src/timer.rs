use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Periodic callback on a dedicated thread.
///
/// Stands in for a hardware timer compare-match interrupt: the callback runs
/// at a fixed cadence on its own context, preempting nothing but sharing
/// state with the rest of the system only through what it captures. The
/// first tick fires one full period after [`spawn`](PeriodicTimer::spawn).
///
/// Ticks are scheduled against an absolute deadline, so a slow callback
/// delays ticks but does not accumulate drift.
pub struct PeriodicTimer {
    shared: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTimer {
    /// Spawn a named timer thread invoking `tick` every `period`.
    pub fn spawn<F>(name: &str, period: Duration, tick: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_shared = Arc::clone(&shared);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let (lock, cv) = &*thread_shared;
                let mut next = Instant::now() + period;
                loop {
                    let mut stopped = lock.lock().unwrap_or_else(|e| e.into_inner());
                    loop {
                        if *stopped {
                            return;
                        }
                        let now = Instant::now();
                        if now >= next {
                            break;
                        }
                        let (guard, _timeout) = cv
                            .wait_timeout(stopped, next - now)
                            .unwrap_or_else(|e| e.into_inner());
                        stopped = guard;
                    }
                    drop(stopped);
                    tick();
                    next += period;
                }
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Stop the timer and wait for the thread to exit. Idempotent.
    pub fn stop(&mut self) {
        let (lock, cv) = &*self.shared;
        *lock.lock().unwrap_or_else(|e| e.into_inner()) = true;
        cv.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PeriodicTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
