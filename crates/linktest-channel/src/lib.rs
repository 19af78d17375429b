//! Channel-peripheral abstraction for serial link self-testing.
//!
//! Provides a unified interface over the hardware a link self-test needs:
//! - A bulk-transfer engine that moves whole frames without per-byte CPU work
//! - A receive-idle timeout that infers "frame ended" from line silence
//! - A single-byte holding register for stray receive artifacts
//!
//! This is the lowest layer of linktest. The harness drives everything
//! through the [`ChannelPeripheral`] trait; [`LoopbackChannel`] is the
//! in-memory reference implementation used for portable testing and the CLI.

pub mod error;
pub mod indicator;
pub mod loopback;
pub mod timer;
pub mod traits;

pub use error::{ChannelError, Result};
pub use indicator::{Indicator, IndicatorState, LatchedIndicator};
pub use loopback::{FaultPlan, LoopbackChannel, LoopbackConfig};
pub use timer::PeriodicTimer;
pub use traits::{ChannelEvent, ChannelPeripheral, Direction, EventHook, TransferStatus};
