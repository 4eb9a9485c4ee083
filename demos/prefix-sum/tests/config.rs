// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::io::Write;

use clap::Parser;
use prefix_sum::config::DemoConfig;
use serial_test::serial;
use sluice_models::kernel::ReadMode;
use sluice_models::pipeline::{PipelineConfig, PipelineVariant};

fn parse(args: &[&str]) -> DemoConfig {
    let mut argv = vec!["prefix-sum"];
    argv.extend_from_slice(args);
    DemoConfig::try_parse_from(argv).unwrap()
}

fn set_env(key: &str, value: &str) {
    // Tests touching the environment are serialised.
    unsafe { std::env::set_var(key, value) };
}

fn remove_env(key: &str) {
    unsafe { std::env::remove_var(key) };
}

#[test]
#[serial]
fn defaults() {
    let config = DemoConfig::from_cli(parse(&[])).unwrap();
    assert_eq!(config.pipeline_config(), PipelineConfig::default());
    assert_eq!(config.input().len(), 65536);
    assert_eq!(config.input()[3], 3);
}

#[test]
#[serial]
fn command_line_overrides() {
    let config = DemoConfig::from_cli(parse(&[
        "--lanes",
        "4",
        "--variant",
        "two-stage",
        "--read-mode",
        "non-blocking",
        "--num-elements",
        "12",
    ]))
    .unwrap();
    let pipeline = config.pipeline_config();
    assert_eq!(pipeline.lanes, 4);
    assert_eq!(pipeline.variant, PipelineVariant::TwoStage);
    assert_eq!(pipeline.read_mode, ReadMode::NonBlocking);
    assert_eq!(config.input(), (0..12).collect::<Vec<u64>>());
}

#[test]
#[serial]
fn environment_overrides_defaults_but_not_command_line() {
    set_env("SLUICE_CHANNEL_DEPTH", "2");
    set_env("SLUICE_LANES", "16");
    let config = DemoConfig::from_cli(parse(&["--lanes", "2"]));
    remove_env("SLUICE_CHANNEL_DEPTH");
    remove_env("SLUICE_LANES");

    let pipeline = config.unwrap().pipeline_config();
    assert_eq!(pipeline.channel_depth, 2);
    assert_eq!(pipeline.lanes, 2);
}

#[test]
#[serial]
fn config_file_is_layered_under_environment() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(file, "lanes = 3").unwrap();
    writeln!(file, "channel_depth = 7").unwrap();
    writeln!(file, "variant = \"two-stage\"").unwrap();
    let path = file.path().to_str().unwrap().to_string();

    set_env("SLUICE_CHANNEL_DEPTH", "5");
    let config = DemoConfig::from_cli(parse(&["--config-file", path.as_str()]));
    remove_env("SLUICE_CHANNEL_DEPTH");

    let pipeline = config.unwrap().pipeline_config();
    assert_eq!(pipeline.lanes, 3);
    assert_eq!(pipeline.channel_depth, 5);
    assert_eq!(pipeline.variant, PipelineVariant::TwoStage);
}

#[test]
#[serial]
fn bad_environment_value_is_an_error() {
    set_env("SLUICE_LANES", "many");
    let config = DemoConfig::from_cli(parse(&[]));
    remove_env("SLUICE_LANES");
    assert!(config.is_err());
}
