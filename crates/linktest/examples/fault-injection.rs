//! Fault-injection demo — lose the first byte of every frame.
//!
//! The frame's pad-byte preamble exists exactly for this case: the engine
//! stalls one byte short and the idle timeout ends the frame, but the sync
//! marker and payload still line up, so validation passes.
//!
//! Run with:
//!   cargo run --example fault-injection

use std::sync::Arc;
use std::time::Duration;

use linktest::channel::{FaultPlan, LoopbackChannel, LoopbackConfig};
use linktest::frame::ReferenceFrame;
use linktest::harness::{BoundaryCause, LinkTester, TesterConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = Arc::new(LoopbackChannel::new(LoopbackConfig {
        faults: FaultPlan {
            drop_first_every: 1,
            ..FaultPlan::default()
        },
        ..LoopbackConfig::default()
    })?);

    let mut handle = LinkTester::new(channel, ReferenceFrame::test_pattern())
        .with_config(TesterConfig {
            frame_cadence: Duration::from_millis(100),
            health_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_millis(10),
        })
        .start()?;

    let mut seen = 0;
    while seen < 5 {
        if let Some(outcome) = handle.process_next(Duration::from_secs(2))? {
            seen += 1;
            assert_eq!(outcome.cause, BoundaryCause::TimeoutLoss);
            eprintln!(
                "frame ended by idle timeout, {} bytes captured, valid: {}",
                outcome.received, outcome.ok
            );
        }
    }

    let report = handle.stop();
    eprintln!(
        "done: {} ok / {} timeout boundaries",
        report.frames_ok, report.timeout_boundaries
    );
    Ok(())
}
