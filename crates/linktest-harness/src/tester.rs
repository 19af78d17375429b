use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use linktest_channel::{
    ChannelPeripheral, Indicator, LatchedIndicator, PeriodicTimer,
};
use linktest_frame::ReferenceFrame;
use tracing::info;

use crate::boundary::BoundarySlot;
use crate::consumer::{FrameConsumer, FrameOutcome};
use crate::detector::BoundaryDetector;
use crate::error::Result;
use crate::health::HealthMonitor;
use crate::lifecycle::RxLifecycle;
use crate::scheduler::TransmitScheduler;
use crate::stats::{LinkStats, StatsSnapshot};

/// Cadences of the self-test loop.
#[derive(Debug, Clone)]
pub struct TesterConfig {
    /// Interval between reference-frame transmissions.
    pub frame_cadence: Duration,
    /// Interval of the independent health check.
    pub health_interval: Duration,
    /// Receive quiet window that ends a stalled frame.
    pub idle_timeout: Duration,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            frame_cadence: Duration::from_secs(1),
            health_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_millis(5),
        }
    }
}

/// Wires the scheduler, boundary detector, consumer and health monitor
/// around one channel peripheral.
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use linktest_channel::{LoopbackChannel, LoopbackConfig};
/// use linktest_frame::ReferenceFrame;
/// use linktest_harness::LinkTester;
///
/// # fn main() -> linktest_harness::Result<()> {
/// let channel = Arc::new(LoopbackChannel::new(LoopbackConfig::default())?);
/// let mut handle = LinkTester::new(channel, ReferenceFrame::test_pattern()).start()?;
/// while handle.stats().frames_ok < 10 {
///     handle.process_next(Duration::from_secs(2))?;
/// }
/// let report = handle.stop();
/// # Ok(())
/// # }
/// ```
pub struct LinkTester {
    channel: Arc<dyn ChannelPeripheral>,
    reference: ReferenceFrame,
    config: TesterConfig,
    indicator: Arc<dyn Indicator>,
}

impl LinkTester {
    pub fn new(channel: Arc<dyn ChannelPeripheral>, reference: ReferenceFrame) -> Self {
        Self {
            channel,
            reference,
            config: TesterConfig::default(),
            indicator: Arc::new(LatchedIndicator::new()),
        }
    }

    /// Override the default cadences.
    pub fn with_config(mut self, config: TesterConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive a caller-owned indicator instead of the built-in latched one.
    pub fn with_indicator(mut self, indicator: Arc<dyn Indicator>) -> Self {
        self.indicator = indicator;
        self
    }

    /// Arm the receive path, install the boundary handlers and start the
    /// transmit and health timers.
    pub fn start(self) -> Result<TesterHandle> {
        let stats = Arc::new(LinkStats::new());
        let slot = Arc::new(BoundarySlot::new());
        let lifecycle = Arc::new(RxLifecycle::new());
        let last_ok = Arc::new(AtomicBool::new(false));

        // receive path first: the first transmitted frame must find the
        // engine armed. Nothing can fire before the hook is installed —
        // the line is quiet and the idle timeout is not yet armed.
        lifecycle.arm();
        self.channel.start_bulk_receive(self.reference.len())?;

        let detector = Arc::new(BoundaryDetector::new(
            Arc::clone(&self.channel),
            Arc::clone(&slot),
            Arc::clone(&lifecycle),
            Arc::clone(&stats),
            self.config.idle_timeout,
        ));
        let hook_detector = Arc::clone(&detector);
        self.channel
            .set_event_hook(Box::new(move |event| hook_detector.handle(event)));
        self.channel.arm_idle_timeout(self.config.idle_timeout);

        let scheduler = TransmitScheduler::new(
            Arc::clone(&self.channel),
            self.reference.clone(),
            Arc::clone(&last_ok),
            Arc::clone(&self.indicator),
            Arc::clone(&stats),
        );
        let tx_timer = match PeriodicTimer::spawn("linktest-tx", self.config.frame_cadence, move || {
            scheduler.tick()
        }) {
            Ok(timer) => timer,
            Err(err) => {
                self.channel.clear_event_hook();
                return Err(err.into());
            }
        };

        let monitor = HealthMonitor::new(
            Arc::clone(&last_ok),
            Arc::clone(&self.indicator),
            Arc::clone(&stats),
        );
        let health_timer = match PeriodicTimer::spawn(
            "linktest-health",
            self.config.health_interval,
            move || monitor.tick(),
        ) {
            Ok(timer) => timer,
            Err(err) => {
                self.channel.clear_event_hook();
                return Err(err.into());
            }
        };

        let consumer = FrameConsumer::new(
            Arc::clone(&self.channel),
            self.reference.clone(),
            slot,
            lifecycle,
            last_ok,
            Arc::clone(&self.indicator),
            Arc::clone(&stats),
        );

        info!(
            frame_len = self.reference.len(),
            cadence_ms = self.config.frame_cadence.as_millis() as u64,
            idle_ms = self.config.idle_timeout.as_millis() as u64,
            "link self-test started"
        );

        Ok(TesterHandle {
            channel: self.channel,
            consumer,
            stats,
            tx_timer,
            health_timer,
        })
    }
}

/// A running self-test. Pump it with [`process_next`](Self::process_next).
///
/// Dropping the handle stops the timers, detaches the boundary handlers
/// and halts the receive engine.
pub struct TesterHandle {
    channel: Arc<dyn ChannelPeripheral>,
    consumer: FrameConsumer,
    stats: Arc<LinkStats>,
    tx_timer: PeriodicTimer,
    health_timer: PeriodicTimer,
}

impl TesterHandle {
    /// Wait for the next frame boundary and process it.
    pub fn process_next(&mut self, timeout: Duration) -> Result<Option<FrameOutcome>> {
        self.consumer.process_next(timeout)
    }

    /// Counters so far.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop the loop and return the final counters.
    pub fn stop(mut self) -> StatsSnapshot {
        self.shutdown();
        self.stats.snapshot()
    }

    fn shutdown(&mut self) {
        self.tx_timer.stop();
        self.health_timer.stop();
        self.channel.clear_event_hook();
        self.channel.halt_bulk_receive();
        info!("link self-test stopped");
    }
}

impl Drop for TesterHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use linktest_channel::{FaultPlan, LoopbackChannel, LoopbackConfig};

    use super::*;
    use crate::boundary::BoundaryCause;

    fn quick_config() -> TesterConfig {
        TesterConfig {
            frame_cadence: Duration::from_millis(25),
            // long enough that the independent health tick cannot swallow a
            // success between an outcome and its assertion
            health_interval: Duration::from_millis(500),
            idle_timeout: Duration::from_millis(10),
        }
    }

    fn start_with_faults(faults: FaultPlan) -> (Arc<LatchedIndicator>, TesterHandle) {
        start_with(faults, quick_config())
    }

    fn start_with(
        faults: FaultPlan,
        config: TesterConfig,
    ) -> (Arc<LatchedIndicator>, TesterHandle) {
        let channel = Arc::new(
            LoopbackChannel::new(LoopbackConfig {
                faults,
                ..LoopbackConfig::default()
            })
            .expect("loopback should start"),
        );
        let indicator = Arc::new(LatchedIndicator::new());
        let handle = LinkTester::new(channel, ReferenceFrame::test_pattern())
            .with_config(config)
            .with_indicator(Arc::clone(&indicator) as Arc<dyn Indicator>)
            .start()
            .expect("tester should start");
        (indicator, handle)
    }

    /// Pump until an outcome matching `pred`, or panic after `tries` frames.
    fn pump_until(
        handle: &mut TesterHandle,
        tries: usize,
        pred: impl Fn(&FrameOutcome) -> bool,
    ) -> FrameOutcome {
        for _ in 0..tries {
            if let Some(outcome) = handle
                .process_next(Duration::from_secs(2))
                .expect("processing should succeed")
            {
                if pred(&outcome) {
                    return outcome;
                }
            }
        }
        panic!("no matching frame outcome after {tries} attempts");
    }

    #[test]
    fn clean_loopback_goes_active() {
        let (indicator, mut handle) = start_with_faults(FaultPlan::default());

        let outcome = pump_until(&mut handle, 10, |o| o.ok);
        assert_eq!(outcome.cause, BoundaryCause::Complete);
        assert!(indicator.is_active());

        let report = handle.stop();
        assert!(report.frames_ok >= 1);
        assert!(report.complete_boundaries >= 1);
    }

    #[test]
    fn lost_leading_pad_byte_still_validates() {
        // the preamble exists exactly so that a lost first byte is harmless:
        // the frame ends via idle timeout, but the marker and payload line up
        let (indicator, mut handle) = start_with_faults(FaultPlan {
            drop_first_every: 1,
            ..FaultPlan::default()
        });

        let outcome = pump_until(&mut handle, 10, |o| o.ok);
        assert_eq!(outcome.cause, BoundaryCause::TimeoutLoss);
        assert!(indicator.is_active());

        let report = handle.stop();
        assert!(report.timeout_boundaries >= 1);
        assert_eq!(report.complete_boundaries, 0);
    }

    #[test]
    fn corrupted_byte_goes_inactive() {
        let (indicator, mut handle) = start_with_faults(FaultPlan {
            corrupt_every: 1,
            ..FaultPlan::default()
        });

        let outcome = pump_until(&mut handle, 10, |o| {
            o.cause == BoundaryCause::Complete && !o.ok
        });
        assert!(!outcome.ok);
        assert!(!indicator.is_active());

        let report = handle.stop();
        assert!(report.content_mismatch >= 1);
        assert_eq!(report.frames_ok, 0);
    }

    #[test]
    fn silent_channel_degrades_via_health_monitor() {
        let (indicator, mut handle) = start_with(
            FaultPlan {
                silent: true,
                ..FaultPlan::default()
            },
            TesterConfig {
                frame_cadence: Duration::from_millis(25),
                health_interval: Duration::from_millis(40),
                idle_timeout: Duration::from_millis(10),
            },
        );

        // no byte ever arrives: the idle timeout never starts counting, so
        // no boundary reaches the consumer — only the health monitor acts
        let waited = handle
            .process_next(Duration::from_millis(150))
            .expect("waiting should not fail");
        assert_eq!(waited, None);
        assert!(!indicator.is_active());

        let report = handle.stop();
        assert_eq!(report.frames_ok, 0);
        assert_eq!(report.timeout_boundaries, 0);
        assert!(report.cycles >= 2, "scheduler kept transmitting");
        assert!(report.health_timeouts >= 1);
    }

    #[test]
    fn alternating_faults_recover_per_cycle() {
        // every 2nd frame corrupted: health flips with each outcome
        let (indicator, mut handle) = start_with_faults(FaultPlan {
            corrupt_every: 2,
            ..FaultPlan::default()
        });

        pump_until(&mut handle, 10, |o| o.ok);
        assert!(indicator.is_active());
        pump_until(&mut handle, 10, |o| !o.ok && o.cause == BoundaryCause::Complete);
        assert!(!indicator.is_active());
        pump_until(&mut handle, 10, |o| o.ok);
        assert!(indicator.is_active());

        let report = handle.stop();
        assert!(report.frames_ok >= 2);
        assert!(report.content_mismatch >= 1);
    }
}
