use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use linktest_channel::{ChannelPeripheral, Indicator, IndicatorState};
use linktest_frame::{validate, ReferenceFrame};
use tracing::{debug, trace, warn};

use crate::boundary::{BoundaryCause, BoundarySlot};
use crate::error::{HarnessError, Result};
use crate::lifecycle::RxLifecycle;
use crate::stats::LinkStats;

/// Result of one processed frame cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// What ended the frame.
    pub cause: BoundaryCause,
    /// Whether the frame validated byte-exact.
    pub ok: bool,
    /// Bytes the engine had captured when the boundary fired.
    pub received: usize,
}

/// Main-loop half of the hand-off.
///
/// Blocks on the boundary slot, validates whatever the engine captured,
/// drives the indicator and success flag, then resynchronizes the receive
/// path for the next frame: drain the stale holding-register byte, present
/// a zero-filled buffer, re-arm the engine. Failure is observational only —
/// the next scheduler tick produces a fresh attempt.
pub struct FrameConsumer {
    channel: Arc<dyn ChannelPeripheral>,
    reference: ReferenceFrame,
    slot: Arc<BoundarySlot>,
    lifecycle: Arc<RxLifecycle>,
    last_ok: Arc<AtomicBool>,
    indicator: Arc<dyn Indicator>,
    stats: Arc<LinkStats>,
    frame_buf: BytesMut,
}

impl FrameConsumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channel: Arc<dyn ChannelPeripheral>,
        reference: ReferenceFrame,
        slot: Arc<BoundarySlot>,
        lifecycle: Arc<RxLifecycle>,
        last_ok: Arc<AtomicBool>,
        indicator: Arc<dyn Indicator>,
        stats: Arc<LinkStats>,
    ) -> Self {
        let frame_len = reference.len();
        Self {
            channel,
            reference,
            slot,
            lifecycle,
            last_ok,
            indicator,
            stats,
            frame_buf: BytesMut::with_capacity(frame_len),
        }
    }

    /// Wait up to `timeout` for the next boundary and process one frame.
    ///
    /// Returns `Ok(None)` if no boundary arrived in time.
    pub fn process_next(&mut self, timeout: Duration) -> Result<Option<FrameOutcome>> {
        match self.slot.recv_timeout(timeout) {
            Some(cause) => self.process(cause).map(Some),
            None => Ok(None),
        }
    }

    fn process(&mut self, cause: BoundaryCause) -> Result<FrameOutcome> {
        if !self.lifecycle.begin_processing() {
            warn!(?cause, "boundary event without pending lifecycle state");
        }
        // the engine's write path stays disabled until re-armed below
        self.channel.halt_bulk_receive();
        self.last_ok.store(false, Ordering::Release);

        self.frame_buf.clear();
        self.frame_buf.resize(self.reference.len(), 0);
        let received = self.channel.copy_received(&mut self.frame_buf);

        let ok = match validate(&self.frame_buf, &self.reference) {
            Ok(()) => {
                trace!(?cause, received, "frame validated");
                self.last_ok.store(true, Ordering::Release);
                self.indicator.set(IndicatorState::Active);
                self.stats.record_ok();
                true
            }
            Err(err) => {
                debug!(%err, ?cause, received, "frame failed validation");
                self.indicator.set(IndicatorState::Inactive);
                self.stats.record_failure(&err);
                false
            }
        };

        // a receive artifact of the finished frame, not the start of the next
        if let Some(byte) = self.channel.read_holding_register() {
            trace!(byte, "discarded stale holding-register byte");
        }

        self.rearm()?;
        Ok(FrameOutcome {
            cause,
            ok,
            received,
        })
    }

    fn rearm(&self) -> Result<()> {
        if !self.lifecycle.arm() {
            warn!("receive lifecycle not idle at re-arm");
        }
        self.channel
            .start_bulk_receive(self.reference.len())
            .map_err(HarnessError::Rearm)
    }
}
