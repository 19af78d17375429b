use crate::traits::Direction;

/// Errors that can occur when driving a channel peripheral.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The bulk engine is still running a transfer in this direction.
    #[error("bulk {direction} engine already active")]
    EngineBusy { direction: Direction },

    /// The programmed transfer length does not fit the engine's buffer.
    #[error("transfer length {requested} exceeds buffer capacity {capacity}")]
    LengthExceedsCapacity { requested: usize, capacity: usize },

    /// The peripheral has shut down and no longer accepts commands.
    #[error("channel peripheral detached")]
    Detached,

    /// A worker or timer thread could not be spawned.
    #[error("thread spawn failed: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
