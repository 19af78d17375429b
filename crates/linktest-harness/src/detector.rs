use std::sync::Arc;
use std::time::Duration;

use linktest_channel::{ChannelEvent, ChannelPeripheral};
use tracing::{trace, warn};

use crate::boundary::{BoundaryCause, BoundarySlot};
use crate::lifecycle::RxLifecycle;
use crate::stats::LinkStats;

/// The pair of completion handlers that decide "this frame is finished"
/// and hand the receive buffer to the consumer exactly once.
///
/// Runs entirely on the peripheral's event context. The two paths are:
///
/// - **Idle timeout** — the engine stalled mid-frame (a framing loss).
///   The handler re-arms the timeout for the next frame, forcibly halts
///   the engine, waits for it to quiesce, then publishes `TimeoutLoss`.
/// - **Transfer complete** — the whole frame arrived contiguously. The
///   handler re-arms the timeout and publishes `Complete`.
///
/// The lifecycle state machine arbitrates between them: whichever path
/// wins the `Filling → BoundaryPending` transition publishes; a signal
/// that loses is counted and dropped, never queued.
pub struct BoundaryDetector {
    channel: Arc<dyn ChannelPeripheral>,
    slot: Arc<BoundarySlot>,
    lifecycle: Arc<RxLifecycle>,
    stats: Arc<LinkStats>,
    idle_window: Duration,
}

impl BoundaryDetector {
    pub fn new(
        channel: Arc<dyn ChannelPeripheral>,
        slot: Arc<BoundarySlot>,
        lifecycle: Arc<RxLifecycle>,
        stats: Arc<LinkStats>,
        idle_window: Duration,
    ) -> Self {
        Self {
            channel,
            slot,
            lifecycle,
            stats,
            idle_window,
        }
    }

    /// Dispatch one peripheral event.
    pub fn handle(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::IdleTimeout => self.on_idle_timeout(),
            ChannelEvent::ReceiveComplete => self.on_transfer_complete(),
        }
    }

    /// The quiet window expired mid-frame.
    pub fn on_idle_timeout(&self) {
        // reactivates on the first byte of the next frame
        self.channel.arm_idle_timeout(self.idle_window);

        // the engine is stalled waiting for bytes that will not come;
        // halt it and wait until it has flushed any buffered byte
        self.channel.halt_bulk_receive();
        while self.channel.transfer_status().active {
            std::thread::yield_now();
        }

        self.publish(BoundaryCause::TimeoutLoss);
    }

    /// The engine wrote the full frame without stalling.
    pub fn on_transfer_complete(&self) {
        self.channel.arm_idle_timeout(self.idle_window);
        self.publish(BoundaryCause::Complete);
    }

    fn publish(&self, cause: BoundaryCause) {
        if self.lifecycle.mark_boundary() {
            trace!(?cause, "frame boundary");
            self.stats.record_boundary(cause);
            if self.slot.publish(cause) {
                self.stats.record_slot_overwrite();
            }
        } else {
            self.stats.record_boundary_rejected();
            warn!(?cause, "boundary rejected; previous frame still pending");
        }
    }
}
