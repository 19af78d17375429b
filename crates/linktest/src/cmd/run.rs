use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use linktest_channel::{
    FaultPlan, Indicator, IndicatorState, LatchedIndicator, LoopbackChannel, LoopbackConfig,
};
use linktest_frame::ReferenceFrame;
use linktest_harness::{LinkTester, TesterConfig};

use crate::cmd::RunArgs;
use crate::exit::{
    channel_error, harness_error, CliError, CliResult, HEALTH_CHECK_FAILED, SUCCESS, USAGE,
};
use crate::output::{print_report, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = TesterConfig {
        frame_cadence: parse_duration(&args.cadence)?,
        idle_timeout: parse_duration(&args.idle_timeout)?,
        health_interval: parse_duration(&args.health_interval)?,
    };

    let faults = FaultPlan {
        drop_first_every: args.drop_first_every.unwrap_or(0),
        corrupt_every: args.corrupt_every.unwrap_or(0),
        silent: args.silent,
    };

    let channel = LoopbackChannel::new(LoopbackConfig {
        faults,
        ..LoopbackConfig::default()
    })
    .map_err(|err| channel_error("loopback setup failed", err))?;

    let indicator = Arc::new(LatchedIndicator::new());
    let mut handle = LinkTester::new(Arc::new(channel), ReferenceFrame::test_pattern())
        .with_config(config.clone())
        .with_indicator(Arc::clone(&indicator) as Arc<dyn Indicator>)
        .start()
        .map_err(|err| harness_error("self-test start failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let wait = config.frame_cadence.min(Duration::from_millis(250));
    while running.load(Ordering::SeqCst) {
        if args.cycles.is_some_and(|n| handle.stats().cycles >= n) {
            break;
        }
        if let Some(outcome) = handle
            .process_next(wait)
            .map_err(|err| harness_error("frame processing failed", err))?
        {
            tracing::debug!(
                cause = ?outcome.cause,
                ok = outcome.ok,
                received = outcome.received,
                "frame cycle"
            );
        }
    }

    let report = handle.stop();
    let state = indicator.state();
    print_report(&report, state, format);

    if state == IndicatorState::Active {
        Ok(SUCCESS)
    } else {
        Ok(HEALTH_CHECK_FAILED)
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
