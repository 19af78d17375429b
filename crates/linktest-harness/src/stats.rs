use std::sync::atomic::{AtomicU64, Ordering};

use linktest_frame::FrameError;
use serde::Serialize;

use crate::boundary::BoundaryCause;

/// Cross-context counters for one self-test run.
///
/// Written from the timer threads, the peripheral's event context and the
/// consumer; every field is an independent atomic, so a snapshot is
/// consistent per counter but not across counters.
#[derive(Debug, Default)]
pub struct LinkStats {
    cycles: AtomicU64,
    frames_ok: AtomicU64,
    marker_missing: AtomicU64,
    truncated: AtomicU64,
    content_mismatch: AtomicU64,
    complete_boundaries: AtomicU64,
    timeout_boundaries: AtomicU64,
    boundaries_rejected: AtomicU64,
    slot_overwrites: AtomicU64,
    health_timeouts: AtomicU64,
}

impl LinkStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// One transmit cycle kicked off by the scheduler.
    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame validated byte-exact.
    pub fn record_ok(&self) {
        self.frames_ok.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame failed validation.
    pub fn record_failure(&self, error: &FrameError) {
        let counter = match error {
            FrameError::MarkerMissing => &self.marker_missing,
            FrameError::Truncated { .. } => &self.truncated,
            _ => &self.content_mismatch,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A boundary was delivered to the consumer.
    pub fn record_boundary(&self, cause: BoundaryCause) {
        let counter = match cause {
            BoundaryCause::Complete => &self.complete_boundaries,
            BoundaryCause::TimeoutLoss => &self.timeout_boundaries,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// A boundary signal fired while another was still pending.
    pub fn record_boundary_rejected(&self) {
        self.boundaries_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// A published boundary was overwritten before pickup.
    pub fn record_slot_overwrite(&self) {
        self.slot_overwrites.fetch_add(1, Ordering::Relaxed);
    }

    /// A health interval passed with no successful frame.
    pub fn record_health_timeout(&self) {
        self.health_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn frames_ok(&self) -> u64 {
        self.frames_ok.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            frames_ok: self.frames_ok.load(Ordering::Relaxed),
            marker_missing: self.marker_missing.load(Ordering::Relaxed),
            truncated: self.truncated.load(Ordering::Relaxed),
            content_mismatch: self.content_mismatch.load(Ordering::Relaxed),
            complete_boundaries: self.complete_boundaries.load(Ordering::Relaxed),
            timeout_boundaries: self.timeout_boundaries.load(Ordering::Relaxed),
            boundaries_rejected: self.boundaries_rejected.load(Ordering::Relaxed),
            slot_overwrites: self.slot_overwrites.load(Ordering::Relaxed),
            health_timeouts: self.health_timeouts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LinkStats`], serializable for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub frames_ok: u64,
    pub marker_missing: u64,
    pub truncated: u64,
    pub content_mismatch: u64,
    pub complete_boundaries: u64,
    pub timeout_boundaries: u64,
    pub boundaries_rejected: u64,
    pub slot_overwrites: u64,
    pub health_timeouts: u64,
}

impl StatsSnapshot {
    /// Frames that reached the consumer but failed validation.
    pub fn frames_failed(&self) -> u64 {
        self.marker_missing + self.truncated + self.content_mismatch
    }
}
