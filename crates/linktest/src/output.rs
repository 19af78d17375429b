use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use linktest_channel::IndicatorState;
use linktest_harness::StatsSnapshot;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    schema_id: &'a str,
    indicator: String,
    healthy: bool,
    #[serde(flatten)]
    stats: StatsSnapshot,
}

pub fn print_report(stats: &StatsSnapshot, indicator: IndicatorState, format: OutputFormat) {
    let healthy = indicator == IndicatorState::Active;
    match format {
        OutputFormat::Json => {
            let out = ReportOutput {
                schema_id: "https://schemas.oceanic-labs.dev/linktest/cli/v1/report.schema.json",
                indicator: indicator.to_string(),
                healthy,
                stats: *stats,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"])
                .add_row(vec!["indicator".to_string(), indicator.to_string()])
                .add_row(vec!["cycles".to_string(), stats.cycles.to_string()])
                .add_row(vec!["frames ok".to_string(), stats.frames_ok.to_string()])
                .add_row(vec![
                    "marker missing".to_string(),
                    stats.marker_missing.to_string(),
                ])
                .add_row(vec!["truncated".to_string(), stats.truncated.to_string()])
                .add_row(vec![
                    "content mismatch".to_string(),
                    stats.content_mismatch.to_string(),
                ])
                .add_row(vec![
                    "complete boundaries".to_string(),
                    stats.complete_boundaries.to_string(),
                ])
                .add_row(vec![
                    "timeout boundaries".to_string(),
                    stats.timeout_boundaries.to_string(),
                ])
                .add_row(vec![
                    "boundaries rejected".to_string(),
                    stats.boundaries_rejected.to_string(),
                ])
                .add_row(vec![
                    "slot overwrites".to_string(),
                    stats.slot_overwrites.to_string(),
                ])
                .add_row(vec![
                    "health timeouts".to_string(),
                    stats.health_timeouts.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "indicator={} cycles={} ok={} failed={} (marker={} truncated={} mismatch={}) \
                 boundaries: complete={} timeout={} rejected={} overwritten={} health_timeouts={}",
                indicator,
                stats.cycles,
                stats.frames_ok,
                stats.frames_failed(),
                stats.marker_missing,
                stats.truncated,
                stats.content_mismatch,
                stats.complete_boundaries,
                stats.timeout_boundaries,
                stats.boundaries_rejected,
                stats.slot_overwrites,
                stats.health_timeouts
            );
        }
    }
}
