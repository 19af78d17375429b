use std::fmt;

use linktest_channel::ChannelError;
use linktest_harness::HarnessError;

// Exit code constants.
pub const SUCCESS: i32 = 0;
#[allow(dead_code)]
pub const FAILURE: i32 = 1;
pub const CHANNEL_ERROR: i32 = 3;
pub const HEALTH_CHECK_FAILED: i32 = 30;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn channel_error(context: &str, err: ChannelError) -> CliError {
    let code = match err {
        ChannelError::EngineBusy { .. }
        | ChannelError::LengthExceedsCapacity { .. }
        | ChannelError::Detached => CHANNEL_ERROR,
        ChannelError::Spawn(_) => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn harness_error(context: &str, err: HarnessError) -> CliError {
    match err {
        HarnessError::Channel(err) | HarnessError::Rearm(err) => channel_error(context, err),
    }
}
