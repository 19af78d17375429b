use std::fmt;
use std::time::Duration;

use crate::error::Result;

/// Transfer direction of the bulk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Transmit,
    Receive,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Transmit => f.write_str("transmit"),
            Direction::Receive => f.write_str("receive"),
        }
    }
}

/// Snapshot of the bulk receive engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferStatus {
    /// The engine owns the receive buffer and may still write to it.
    pub active: bool,
    /// The engine wrote the full programmed length.
    pub complete: bool,
}

/// Completion signals raised by the peripheral.
///
/// Delivered on the peripheral's own context (the stand-in for interrupt
/// context). Handlers must not block beyond the bounded engine-quiesce poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// No byte arrived within the armed quiet window.
    IdleTimeout,
    /// The bulk receive engine wrote all programmed bytes.
    ReceiveComplete,
}

/// Hook invoked from the peripheral's event context.
pub type EventHook = Box<dyn Fn(ChannelEvent) + Send + Sync>;

/// A bidirectional serial data channel with a bulk-transfer engine.
///
/// The seam between the self-test harness and the hardware. Implementations
/// must uphold the hand-off discipline: once [`halt_bulk_receive`] has been
/// issued and [`transfer_status`] reports the engine inactive, the receive
/// buffer is stable until the next [`start_bulk_receive`].
///
/// [`halt_bulk_receive`]: ChannelPeripheral::halt_bulk_receive
/// [`transfer_status`]: ChannelPeripheral::transfer_status
/// [`start_bulk_receive`]: ChannelPeripheral::start_bulk_receive
pub trait ChannelPeripheral: Send + Sync {
    /// Program the bulk engine to push `frame` out the transmit line.
    fn start_bulk_transmit(&self, frame: &[u8]) -> Result<()>;

    /// Arm the bulk engine to capture the next `len` received bytes.
    ///
    /// The engine's buffer starts zero-filled; no data from a previous
    /// transfer survives a re-arm.
    fn start_bulk_receive(&self, len: usize) -> Result<()>;

    /// Forcibly stop the bulk receive engine. Idempotent.
    fn halt_bulk_receive(&self);

    /// Current state of the bulk receive engine.
    fn transfer_status(&self) -> TransferStatus;

    /// Arm the receive-idle timeout.
    ///
    /// The countdown starts at the next received byte and restarts on each
    /// one after it; the timeout fires once `window` passes with no new
    /// byte. A line that stays completely silent never fires — that case
    /// belongs to the health monitor. Firing disarms the timeout until the
    /// next call.
    fn arm_idle_timeout(&self, window: Duration);

    /// Take the byte sitting in the single-byte receive holding register.
    fn read_holding_register(&self) -> Option<u8>;

    /// Place one byte on the transmit line, bypassing the bulk engine.
    fn write_holding_register(&self, byte: u8) -> Result<()>;

    /// Copy the receive buffer into `dst`, returning the bytes copied.
    ///
    /// Only meaningful while the receive engine is halted or complete.
    fn copy_received(&self, dst: &mut [u8]) -> usize;

    /// Install the handler for [`ChannelEvent`]s, replacing any previous one.
    fn set_event_hook(&self, hook: EventHook);

    /// Remove the event handler. Subsequent events are discarded.
    fn clear_event_hook(&self);
}
