use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::error::{ChannelError, Result};
use crate::traits::{ChannelEvent, ChannelPeripheral, Direction, EventHook, TransferStatus};

/// Deterministic fault injection applied on the transmit side.
///
/// Faults are keyed on a 1-based frame counter: `drop_first_every = 3`
/// mangles frames 3, 6, 9, … A value of 0 disables that fault.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultPlan {
    /// Drop the leading byte of every Nth frame (framing loss).
    pub drop_first_every: u64,
    /// Flip one payload byte of every Nth frame (content mismatch).
    pub corrupt_every: u64,
    /// Swallow every frame entirely (silent channel).
    pub silent: bool,
}

impl FaultPlan {
    fn due(every: u64, seq: u64) -> bool {
        every != 0 && seq % every == 0
    }
}

/// Configuration for the in-memory loopback channel.
#[derive(Debug, Clone)]
pub struct LoopbackConfig {
    /// Time each byte spends on the line. Zero delivers as fast as the
    /// delivery thread can run.
    pub byte_time: Duration,
    /// Receive-engine buffer capacity in bytes.
    pub capacity: usize,
    /// Transmit-side fault injection.
    pub faults: FaultPlan,
}

impl Default for LoopbackConfig {
    fn default() -> Self {
        Self {
            byte_time: Duration::ZERO,
            capacity: 1024,
            faults: FaultPlan::default(),
        }
    }
}

/// In-memory loopback channel: the transmit line is wired to the receive
/// line, with a delivery thread standing in for the wire and the
/// peripheral's interrupt contexts.
///
/// Event hooks are invoked from the delivery thread with no internal locks
/// held, so handlers may call back into any [`ChannelPeripheral`] method.
pub struct LoopbackChannel {
    inner: Arc<Mutex<Inner>>,
    wakeup: Arc<Condvar>,
    hook: Arc<RwLock<Option<EventHook>>>,
    worker: Option<JoinHandle<()>>,
    capacity: usize,
}

struct Inner {
    // wire
    outgoing: VecDeque<u8>,
    byte_time: Duration,
    next_byte_due: Option<Instant>,
    // receive engine
    rx_active: bool,
    rx_complete: bool,
    rx_programmed: usize,
    rx_buf: BytesMut,
    holding: Option<u8>,
    // idle timeout
    idle_window: Duration,
    idle_armed: bool,
    idle_deadline: Option<Instant>,
    // transmit-side faults
    faults: FaultPlan,
    frames_sent: u64,
    shutdown: bool,
}

impl Inner {
    /// One byte comes off the line. Returns the completion event, if any.
    fn deliver(&mut self, byte: u8, now: Instant) -> Option<ChannelEvent> {
        // any arrival starts or restarts the quiet-window countdown
        if self.idle_armed {
            self.idle_deadline = Some(now + self.idle_window);
        }

        if self.rx_active && self.rx_buf.len() < self.rx_programmed {
            self.rx_buf.put_u8(byte);
            if self.rx_buf.len() == self.rx_programmed {
                self.rx_active = false;
                self.rx_complete = true;
                return Some(ChannelEvent::ReceiveComplete);
            }
            None
        } else {
            // engine not draining the line: byte parks in the holding register
            self.holding = Some(byte);
            None
        }
    }

    /// Earliest instant the delivery thread has work to do.
    fn next_deadline(&self) -> Option<Instant> {
        let idle = if self.idle_armed {
            self.idle_deadline
        } else {
            None
        };
        match (self.next_byte_due, idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

impl LoopbackChannel {
    /// Create the channel and start its delivery thread.
    pub fn new(config: LoopbackConfig) -> Result<Self> {
        let capacity = config.capacity;
        let inner = Arc::new(Mutex::new(Inner {
            outgoing: VecDeque::new(),
            byte_time: config.byte_time,
            next_byte_due: None,
            rx_active: false,
            rx_complete: false,
            rx_programmed: 0,
            rx_buf: BytesMut::with_capacity(capacity),
            holding: None,
            idle_window: Duration::ZERO,
            idle_armed: false,
            idle_deadline: None,
            faults: config.faults,
            frames_sent: 0,
            shutdown: false,
        }));
        let wakeup = Arc::new(Condvar::new());
        let hook: Arc<RwLock<Option<EventHook>>> = Arc::new(RwLock::new(None));

        let worker_inner = Arc::clone(&inner);
        let worker_wakeup = Arc::clone(&wakeup);
        let worker_hook = Arc::clone(&hook);
        let worker = std::thread::Builder::new()
            .name("loopback-wire".to_string())
            .spawn(move || delivery_loop(worker_inner, worker_wakeup, worker_hook))?;

        debug!(capacity, "loopback channel started");
        Ok(Self {
            inner,
            wakeup,
            hook,
            worker: Some(worker),
            capacity,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bytes still in flight on the line.
    pub fn line_backlog(&self) -> usize {
        self.lock().outgoing.len()
    }
}

fn delivery_loop(
    inner: Arc<Mutex<Inner>>,
    wakeup: Arc<Condvar>,
    hook: Arc<RwLock<Option<EventHook>>>,
) {
    let mut events: Vec<ChannelEvent> = Vec::new();
    loop {
        {
            let mut guard = inner.lock().unwrap_or_else(|e| e.into_inner());
            if guard.shutdown {
                return;
            }
            let now = Instant::now();

            // deliver every line byte that is due
            while guard.next_byte_due.is_some_and(|due| due <= now) {
                match guard.outgoing.pop_front() {
                    Some(byte) => {
                        let byte_time = guard.byte_time;
                        guard.next_byte_due = if guard.outgoing.is_empty() {
                            None
                        } else {
                            Some(now + byte_time)
                        };
                        if let Some(event) = guard.deliver(byte, now) {
                            events.push(event);
                        }
                    }
                    None => guard.next_byte_due = None,
                }
            }

            // quiet window expiry
            if guard.idle_armed && guard.idle_deadline.is_some_and(|at| at <= now) {
                guard.idle_armed = false;
                guard.idle_deadline = None;
                events.push(ChannelEvent::IdleTimeout);
            }

            if events.is_empty() {
                let guard = match guard.next_deadline() {
                    Some(at) => {
                        let wait = at.saturating_duration_since(now);
                        wakeup
                            .wait_timeout(guard, wait)
                            .unwrap_or_else(|e| e.into_inner())
                            .0
                    }
                    None => wakeup.wait(guard).unwrap_or_else(|e| e.into_inner()),
                };
                drop(guard);
                continue;
            }
        }

        // hooks run with no lock held; handlers may call back into the channel
        let installed = hook.read().unwrap_or_else(|e| e.into_inner());
        for event in events.drain(..) {
            trace!(?event, "loopback event");
            if let Some(handler) = installed.as_ref() {
                handler(event);
            }
        }
    }
}

impl ChannelPeripheral for LoopbackChannel {
    fn start_bulk_transmit(&self, frame: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if inner.shutdown {
            return Err(ChannelError::Detached);
        }
        if !inner.outgoing.is_empty() {
            return Err(ChannelError::EngineBusy {
                direction: Direction::Transmit,
            });
        }

        inner.frames_sent += 1;
        let seq = inner.frames_sent;
        if inner.faults.silent {
            trace!(seq, "frame swallowed (silent fault)");
            return Ok(());
        }
        let drop_first = FaultPlan::due(inner.faults.drop_first_every, seq);
        let corrupt = FaultPlan::due(inner.faults.corrupt_every, seq);
        let corrupt_at = frame.len() / 2;

        for (i, &byte) in frame.iter().enumerate() {
            if i == 0 && drop_first {
                continue;
            }
            let byte = if corrupt && i == corrupt_at {
                byte ^ 0x20
            } else {
                byte
            };
            inner.outgoing.push_back(byte);
        }

        if !inner.outgoing.is_empty() && inner.next_byte_due.is_none() {
            inner.next_byte_due = Some(Instant::now() + inner.byte_time);
        }
        self.wakeup.notify_all();
        Ok(())
    }

    fn start_bulk_receive(&self, len: usize) -> Result<()> {
        let mut inner = self.lock();
        if inner.shutdown {
            return Err(ChannelError::Detached);
        }
        if inner.rx_active {
            return Err(ChannelError::EngineBusy {
                direction: Direction::Receive,
            });
        }
        if len > self.capacity {
            return Err(ChannelError::LengthExceedsCapacity {
                requested: len,
                capacity: self.capacity,
            });
        }
        inner.rx_buf.clear();
        inner.rx_programmed = len;
        inner.rx_active = true;
        inner.rx_complete = false;
        self.wakeup.notify_all();
        Ok(())
    }

    fn halt_bulk_receive(&self) {
        self.lock().rx_active = false;
    }

    fn transfer_status(&self) -> TransferStatus {
        let inner = self.lock();
        TransferStatus {
            active: inner.rx_active,
            complete: inner.rx_complete,
        }
    }

    fn arm_idle_timeout(&self, window: Duration) {
        let mut inner = self.lock();
        inner.idle_window = window;
        inner.idle_armed = true;
        // countdown waits for the first byte
        inner.idle_deadline = None;
        self.wakeup.notify_all();
    }

    fn read_holding_register(&self) -> Option<u8> {
        self.lock().holding.take()
    }

    fn write_holding_register(&self, byte: u8) -> Result<()> {
        let mut inner = self.lock();
        if inner.shutdown {
            return Err(ChannelError::Detached);
        }
        inner.outgoing.push_back(byte);
        if inner.next_byte_due.is_none() {
            inner.next_byte_due = Some(Instant::now() + inner.byte_time);
        }
        self.wakeup.notify_all();
        Ok(())
    }

    fn copy_received(&self, dst: &mut [u8]) -> usize {
        let inner = self.lock();
        let n = dst.len().min(inner.rx_buf.len());
        dst[..n].copy_from_slice(&inner.rx_buf[..n]);
        n
    }

    fn set_event_hook(&self, hook: EventHook) {
        *self.hook.write().unwrap_or_else(|e| e.into_inner()) = Some(hook);
    }

    fn clear_event_hook(&self) {
        *self.hook.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl Drop for LoopbackChannel {
    fn drop(&mut self) {
        self.lock().shutdown = true;
        self.wakeup.notify_all();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        debug!("loopback channel stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    fn paced(byte_time: Duration) -> LoopbackChannel {
        LoopbackChannel::new(LoopbackConfig {
            byte_time,
            ..LoopbackConfig::default()
        })
        .expect("loopback should start")
    }

    fn event_channel(chan: &LoopbackChannel) -> mpsc::Receiver<ChannelEvent> {
        let (tx, rx) = mpsc::channel();
        // Sender is not Sync; the hook must be
        let tx = std::sync::Mutex::new(tx);
        chan.set_event_hook(Box::new(move |event| {
            let _ = tx.lock().unwrap().send(event);
        }));
        rx
    }

    #[test]
    fn full_frame_raises_receive_complete() {
        let chan = paced(Duration::ZERO);
        let events = event_channel(&chan);

        chan.start_bulk_receive(5).expect("receive should arm");
        chan.start_bulk_transmit(b"hello").expect("transmit should start");

        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)),
            Ok(ChannelEvent::ReceiveComplete)
        );
        let status = chan.transfer_status();
        assert!(!status.active);
        assert!(status.complete);

        let mut buf = [0u8; 5];
        assert_eq!(chan.copy_received(&mut buf), 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn idle_timeout_waits_for_first_byte() {
        let chan = paced(Duration::ZERO);
        let events = event_channel(&chan);

        chan.start_bulk_receive(8).expect("receive should arm");
        chan.arm_idle_timeout(Duration::from_millis(10));

        // a silent line never starts the countdown
        assert!(events.recv_timeout(Duration::from_millis(50)).is_err());

        chan.write_holding_register(b'x').expect("write should queue");
        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)),
            Ok(ChannelEvent::IdleTimeout)
        );
        // fires once, then stays disarmed
        assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn byte_arrival_restarts_quiet_window() {
        let chan = paced(Duration::from_millis(2));
        let events = event_channel(&chan);

        chan.start_bulk_receive(16).expect("receive should arm");
        chan.arm_idle_timeout(Duration::from_millis(30));
        chan.start_bulk_transmit(b"abcd").expect("transmit should start");

        // four bytes at 2 ms a piece, then 30 ms of quiet
        let event = events.recv_timeout(Duration::from_secs(1)).expect("event");
        assert_eq!(event, ChannelEvent::IdleTimeout);

        let mut buf = [0u8; 16];
        let got = chan.copy_received(&mut buf);
        assert_eq!(&buf[..got], b"abcd");
    }

    #[test]
    fn byte_without_armed_engine_lands_in_holding_register() {
        let chan = paced(Duration::ZERO);
        let events = event_channel(&chan);

        chan.write_holding_register(b'x').expect("write should queue");
        // nothing armed: no event, byte parks in the holding register
        assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(chan.read_holding_register(), Some(b'x'));
        assert_eq!(chan.read_holding_register(), None);
    }

    #[test]
    fn rearm_yields_empty_buffer() {
        let chan = paced(Duration::ZERO);
        let events = event_channel(&chan);

        chan.start_bulk_receive(3).expect("receive should arm");
        chan.start_bulk_transmit(b"abc").expect("transmit should start");
        events
            .recv_timeout(Duration::from_secs(1))
            .expect("first frame should complete");

        chan.start_bulk_receive(3).expect("re-arm should succeed");
        let mut buf = [0u8; 3];
        assert_eq!(chan.copy_received(&mut buf), 0, "no stale bytes after re-arm");
    }

    #[test]
    fn receive_rejects_double_arm_and_oversize() {
        let chan = paced(Duration::ZERO);
        chan.start_bulk_receive(4).expect("receive should arm");
        assert!(matches!(
            chan.start_bulk_receive(4),
            Err(ChannelError::EngineBusy {
                direction: Direction::Receive
            })
        ));
        chan.halt_bulk_receive();
        assert!(matches!(
            chan.start_bulk_receive(4096),
            Err(ChannelError::LengthExceedsCapacity { .. })
        ));
    }

    #[test]
    fn drop_first_fault_loses_leading_byte() {
        let chan = LoopbackChannel::new(LoopbackConfig {
            faults: FaultPlan {
                drop_first_every: 1,
                ..FaultPlan::default()
            },
            ..LoopbackConfig::default()
        })
        .expect("loopback should start");
        let events = event_channel(&chan);

        chan.start_bulk_receive(8).expect("receive should arm");
        chan.arm_idle_timeout(Duration::from_millis(10));
        chan.start_bulk_transmit(b"*abc").expect("transmit should start");

        // short frame: engine stalls, quiet window expires
        assert_eq!(
            events.recv_timeout(Duration::from_secs(1)),
            Ok(ChannelEvent::IdleTimeout)
        );
        chan.halt_bulk_receive();
        let mut buf = [0u8; 8];
        let got = chan.copy_received(&mut buf);
        assert_eq!(&buf[..got], b"abc");
    }

    #[test]
    fn corrupt_fault_flips_one_byte() {
        let chan = LoopbackChannel::new(LoopbackConfig {
            faults: FaultPlan {
                corrupt_every: 1,
                ..FaultPlan::default()
            },
            ..LoopbackConfig::default()
        })
        .expect("loopback should start");
        let events = event_channel(&chan);

        chan.start_bulk_receive(4).expect("receive should arm");
        chan.start_bulk_transmit(b"abcd").expect("transmit should start");
        events
            .recv_timeout(Duration::from_secs(1))
            .expect("frame should complete");

        let mut buf = [0u8; 4];
        chan.copy_received(&mut buf);
        assert_eq!(&buf, b"abCd");
    }

    #[test]
    fn silent_fault_swallows_frames() {
        let chan = LoopbackChannel::new(LoopbackConfig {
            faults: FaultPlan {
                silent: true,
                ..FaultPlan::default()
            },
            ..LoopbackConfig::default()
        })
        .expect("loopback should start");
        let events = event_channel(&chan);

        chan.start_bulk_receive(4).expect("receive should arm");
        chan.start_bulk_transmit(b"abcd").expect("transmit should start");
        assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
        assert_eq!(chan.line_backlog(), 0);
    }

    #[test]
    fn transmit_rejected_while_line_busy() {
        let chan = paced(Duration::from_secs(1));
        chan.start_bulk_transmit(b"slow").expect("transmit should start");
        assert!(matches!(
            chan.start_bulk_transmit(b"more"),
            Err(ChannelError::EngineBusy {
                direction: Direction::Transmit
            })
        ));
    }
}
