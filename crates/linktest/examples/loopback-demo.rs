//! Minimal loopback self-test — pump ten good frames through a clean channel.
//!
//! Run with:
//!   cargo run --example loopback-demo

use std::sync::Arc;
use std::time::Duration;

use linktest::channel::{LoopbackChannel, LoopbackConfig};
use linktest::frame::ReferenceFrame;
use linktest::harness::{LinkTester, TesterConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = Arc::new(LoopbackChannel::new(LoopbackConfig::default())?);

    let mut handle = LinkTester::new(channel, ReferenceFrame::test_pattern())
        .with_config(TesterConfig {
            frame_cadence: Duration::from_millis(100),
            health_interval: Duration::from_secs(1),
            idle_timeout: Duration::from_millis(5),
        })
        .start()?;

    while handle.stats().frames_ok < 10 {
        if let Some(outcome) = handle.process_next(Duration::from_secs(2))? {
            eprintln!(
                "frame: cause={:?} ok={} received={}",
                outcome.cause, outcome.ok, outcome.received
            );
        }
    }

    let report = handle.stop();
    eprintln!("done: {} cycles, {} ok", report.cycles, report.frames_ok);
    Ok(())
}
