use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Externally observable link-health state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorState {
    Active,
    Inactive,
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorState::Active => f.write_str("active"),
            IndicatorState::Inactive => f.write_str("inactive"),
        }
    }
}

/// A one-way health output — an LED, a GPIO line, a relay.
///
/// No feedback path; the tester observes the indicator, not a return code.
pub trait Indicator: Send + Sync {
    fn set(&self, state: IndicatorState);
}

/// Indicator that latches the last written state for read-back.
#[derive(Debug, Default)]
pub struct LatchedIndicator {
    active: AtomicBool,
}

impl LatchedIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last state written, starting Inactive.
    pub fn state(&self) -> IndicatorState {
        if self.active.load(Ordering::Acquire) {
            IndicatorState::Active
        } else {
            IndicatorState::Inactive
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Indicator for LatchedIndicator {
    fn set(&self, state: IndicatorState) {
        let active = state == IndicatorState::Active;
        let was = self.active.swap(active, Ordering::AcqRel);
        if was != active {
            debug!(%state, "link indicator changed");
        }
    }
}
