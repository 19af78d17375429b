use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use linktest_channel::{Indicator, IndicatorState};
use tracing::debug;

use crate::stats::LinkStats;

/// Time-bounded "no recent success implies unhealthy" guarantee.
///
/// Runs at its own cadence, independent of the frame cycle: if no frame
/// validated since the previous tick, the indicator is driven Inactive —
/// even if the consumer never ran at all (total receive silence). The
/// success flag is cleared on every tick, so one good frame keeps the
/// indicator lit for at most one interval.
pub struct HealthMonitor {
    last_ok: Arc<AtomicBool>,
    indicator: Arc<dyn Indicator>,
    stats: Arc<LinkStats>,
}

impl HealthMonitor {
    pub fn new(
        last_ok: Arc<AtomicBool>,
        indicator: Arc<dyn Indicator>,
        stats: Arc<LinkStats>,
    ) -> Self {
        Self {
            last_ok,
            indicator,
            stats,
        }
    }

    /// One interval elapsed; settle and clear the success flag.
    pub fn tick(&self) {
        if !self.last_ok.swap(false, Ordering::AcqRel) {
            debug!("no frame validated this interval");
            self.stats.record_health_timeout();
            self.indicator.set(IndicatorState::Inactive);
        }
    }
}
