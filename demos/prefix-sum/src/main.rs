// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Run a prefix-sum pipeline and report how long it took.
//!
//! See `lib.rs` for details.

use std::process::ExitCode;

use prefix_sum::config::DemoConfig;
use sluice_models::pipeline::{ExecutionContext, run_and_verify};
use sluice_track::builder::{TrackerConfig, setup_trackers};
use sluice_track::entity::toplevel;
use sluice_track::{Tracker, error, info};

fn build_tracker(config: &DemoConfig) -> Result<Tracker, String> {
    let stdout = TrackerConfig {
        enable: true,
        level: config.stdout_level.unwrap_or(log::Level::Info),
        filter_regex: config.filter_regex.as_deref().unwrap_or(""),
        file: None,
    };
    let log_file = TrackerConfig {
        enable: config.log_file.is_some(),
        level: config.log_level.unwrap_or(log::Level::Trace),
        filter_regex: "",
        file: config.log_file.as_deref(),
    };
    setup_trackers(&stdout, &log_file).map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    let config = match DemoConfig::parse_all_sources() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    let tracker = match build_tracker(&config) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let app = toplevel(&tracker, "prefix-sum");
    let pipeline_config = config.pipeline_config();
    let input = config.input();
    info!(app ; "Streaming {} elements through a {:?} pipeline ({} lanes, depth {}, {:?} reads)",
        input.len(), pipeline_config.variant, pipeline_config.lanes,
        pipeline_config.channel_depth, pipeline_config.read_mode);

    let ctx = ExecutionContext::new(tracker.clone()).with_clock_mhz(config.clock_mhz());
    let result = run_and_verify(&ctx, &pipeline_config, &input);
    let exit_code = match result {
        Ok(summary) => {
            info!(app ; "PASSED: {} flits in {} ticks ({:.1} ns at {} MHz)",
                summary.flits, summary.ticks, summary.elapsed_ns(), ctx.clock_mhz);
            info!(app ; "Bandwidth: {:.3} GB/s ({} bytes)",
                summary.bandwidth_gbps(), summary.bytes_streamed());
            if summary.bubbles > 0 {
                info!(app ; "{} bubbles", summary.bubbles);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(app ; "FAILED: {e}");
            ExitCode::FAILURE
        }
    };

    tracker.shutdown();
    exit_code
}
