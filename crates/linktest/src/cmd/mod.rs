use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod envinfo;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the loopback self-test and report link health.
    Run(RunArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn dispatch(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop after N transmit cycles. Default: run until interrupted.
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,

    /// Frame transmit cadence (e.g. 1s, 250ms).
    #[arg(long, default_value = "250ms")]
    pub cadence: String,

    /// Receive quiet window that ends a stalled frame (e.g. 5ms).
    #[arg(long, default_value = "5ms")]
    pub idle_timeout: String,

    /// Health-check interval (e.g. 1s).
    #[arg(long, default_value = "1s")]
    pub health_interval: String,

    /// Drop the leading byte of every Nth frame.
    #[arg(long, value_name = "N", conflicts_with = "silent")]
    pub drop_first_every: Option<u64>,

    /// Corrupt one byte of every Nth frame.
    #[arg(long, value_name = "N", conflicts_with = "silent")]
    pub corrupt_every: Option<u64>,

    /// Swallow every transmitted frame (exercise the health monitor).
    #[arg(long)]
    pub silent: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}
