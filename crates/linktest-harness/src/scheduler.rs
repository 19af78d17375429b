use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use linktest_channel::{ChannelPeripheral, Indicator, IndicatorState};
use linktest_frame::ReferenceFrame;
use tracing::warn;

use crate::stats::LinkStats;

/// Periodic transmit kick.
///
/// Each tick first settles the previous cycle: if no frame validated since
/// the last tick, the indicator goes Inactive. The success flag is then
/// cleared unconditionally and a fresh reference-frame transmission is
/// started. At the configured cadence the previous transfer is long done,
/// so a busy engine means the line is misconfigured; it is logged and the
/// cycle skipped, never escalated.
pub struct TransmitScheduler {
    channel: Arc<dyn ChannelPeripheral>,
    reference: ReferenceFrame,
    last_ok: Arc<AtomicBool>,
    indicator: Arc<dyn Indicator>,
    stats: Arc<LinkStats>,
}

impl TransmitScheduler {
    pub fn new(
        channel: Arc<dyn ChannelPeripheral>,
        reference: ReferenceFrame,
        last_ok: Arc<AtomicBool>,
        indicator: Arc<dyn Indicator>,
        stats: Arc<LinkStats>,
    ) -> Self {
        Self {
            channel,
            reference,
            last_ok,
            indicator,
            stats,
        }
    }

    /// One timer tick: settle the previous cycle, start the next.
    pub fn tick(&self) {
        if !self.last_ok.load(Ordering::Acquire) {
            self.indicator.set(IndicatorState::Inactive);
        }
        self.last_ok.store(false, Ordering::Release);

        self.stats.record_cycle();
        if let Err(err) = self.channel.start_bulk_transmit(self.reference.as_bytes()) {
            warn!(error = %err, "transmit re-arm failed; skipping cycle");
        }
    }
}

#[cfg(test)]
mod tests {
    use linktest_channel::{LatchedIndicator, LoopbackChannel, LoopbackConfig};

    use super::*;

    fn fixture() -> (
        Arc<LoopbackChannel>,
        Arc<AtomicBool>,
        Arc<LatchedIndicator>,
        Arc<LinkStats>,
        TransmitScheduler,
    ) {
        let channel =
            Arc::new(LoopbackChannel::new(LoopbackConfig::default()).expect("loopback starts"));
        let last_ok = Arc::new(AtomicBool::new(false));
        let indicator = Arc::new(LatchedIndicator::new());
        let stats = Arc::new(LinkStats::new());
        let scheduler = TransmitScheduler::new(
            Arc::clone(&channel) as Arc<dyn ChannelPeripheral>,
            ReferenceFrame::test_pattern(),
            Arc::clone(&last_ok),
            Arc::clone(&indicator) as Arc<dyn Indicator>,
            Arc::clone(&stats),
        );
        (channel, last_ok, indicator, stats, scheduler)
    }

    #[test]
    fn tick_clears_success_flag_and_transmits() {
        let (channel, last_ok, _indicator, stats, scheduler) = fixture();
        last_ok.store(true, Ordering::Release);

        scheduler.tick();

        assert!(!last_ok.load(Ordering::Acquire));
        assert_eq!(stats.cycles(), 1);
        // the reference frame went out on the line
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(channel.line_backlog(), 0);
    }

    #[test]
    fn tick_without_success_degrades_indicator() {
        let (_channel, _last_ok, indicator, _stats, scheduler) = fixture();
        indicator.set(IndicatorState::Active);

        scheduler.tick();
        assert!(!indicator.is_active());
    }

    #[test]
    fn tick_with_success_keeps_indicator() {
        let (_channel, last_ok, indicator, _stats, scheduler) = fixture();
        indicator.set(IndicatorState::Active);
        last_ok.store(true, Ordering::Release);

        scheduler.tick();
        assert!(indicator.is_active(), "a good cycle must not degrade");
    }
}
