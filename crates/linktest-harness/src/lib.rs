//! Self-test loop for serial data channels.
//!
//! This is the "just works" layer. Point a [`LinkTester`] at a
//! [`ChannelPeripheral`](linktest_channel::ChannelPeripheral), start it, and
//! pump frames: a scheduler transmits the reference frame at a fixed
//! cadence, the boundary detector turns the peripheral's completion signals
//! into exactly one hand-off per frame, and the consumer validates what
//! arrived and drives the health indicator.
//!
//! The concurrency model mirrors the hardware it stands in for: boundary
//! handlers run on the peripheral's event context and the timer threads,
//! the consumer runs wherever the caller pumps it, and the two sides meet
//! only at the single-slot [`BoundarySlot`] and a pair of atomic flags.

pub mod boundary;
pub mod consumer;
pub mod detector;
pub mod error;
pub mod health;
pub mod lifecycle;
pub mod scheduler;
pub mod stats;
pub mod tester;

pub use boundary::{BoundaryCause, BoundarySlot};
pub use consumer::{FrameConsumer, FrameOutcome};
pub use detector::BoundaryDetector;
pub use error::{HarnessError, Result};
pub use health::HealthMonitor;
pub use lifecycle::{RxLifecycle, RxState};
pub use scheduler::TransmitScheduler;
pub use stats::{LinkStats, StatsSnapshot};
pub use tester::{LinkTester, TesterConfig, TesterHandle};
