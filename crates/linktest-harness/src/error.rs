use linktest_channel::ChannelError;

/// Errors surfaced by the self-test harness.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The channel peripheral rejected a command.
    #[error("channel peripheral error: {0}")]
    Channel(#[from] ChannelError),

    /// The receive engine could not be re-armed for the next frame.
    ///
    /// Distinct from [`HarnessError::Channel`]: a failed re-arm leaves the
    /// receive path dead, so callers should stop the run rather than retry.
    #[error("receive re-arm failed: {0}")]
    Rearm(#[source] ChannelError),
}

pub type Result<T> = std::result::Result<T, HarnessError>;
