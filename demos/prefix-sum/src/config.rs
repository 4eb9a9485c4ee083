// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Layered configuration of the demo.

use std::path::PathBuf;

use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use sluice_models::flit::{DEFAULT_LANES, Element, Padding};
use sluice_models::kernel::ReadMode;
use sluice_models::pipeline::{
    DEFAULT_CHANNEL_DEPTH, DEFAULT_CLOCK_MHZ, PipelineConfig, PipelineVariant, RunMode,
};

/// Prefix of environment variables read by the demo.
pub const ENV_PREFIX: &str = "SLUICE_";

const DEFAULT_NUM_ELEMENTS: usize = 65536;

/// Every value is optional so that each layer only overrides what it sets.
#[derive(Clone, Debug, PartialEq, Parser, Serialize, Deserialize)]
#[command(about = "Streaming prefix-sum pipeline simulation")]
pub struct DemoConfig {
    /// TOML file with settings that override the defaults.
    #[arg(long)]
    #[serde(skip)]
    pub config_file: Option<PathBuf>,

    /// Number of elements to stream.
    #[arg(long)]
    pub num_elements: Option<usize>,

    /// Elements per flit.
    #[arg(long)]
    pub lanes: Option<usize>,

    /// Capacity of every channel.
    #[arg(long)]
    pub channel_depth: Option<usize>,

    #[arg(long, value_enum)]
    pub variant: Option<PipelineVariant>,

    #[arg(long, value_enum)]
    pub read_mode: Option<ReadMode>,

    /// Handling of a final partial flit.
    #[arg(long, value_enum)]
    pub padding: Option<Padding>,

    #[arg(long, value_enum)]
    pub run_mode: Option<RunMode>,

    /// Fail if the run takes more than this many ticks.
    #[arg(long)]
    pub watchdog_ticks: Option<u64>,

    /// Clock frequency used to report elapsed time.
    #[arg(long)]
    pub clock_mhz: Option<f64>,

    /// Level of messages printed to the console.
    #[arg(long)]
    pub stdout_level: Option<log::Level>,

    /// Only entities matching this regular expression log at
    /// `stdout-level`; the rest only report errors.
    #[arg(long)]
    pub filter_regex: Option<String>,

    /// Also write a full trace to this file.
    #[arg(long)]
    pub log_file: Option<String>,

    /// Level of events written to `log-file`.
    #[arg(long)]
    pub log_level: Option<log::Level>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            config_file: None,
            num_elements: Some(DEFAULT_NUM_ELEMENTS),
            lanes: Some(DEFAULT_LANES),
            channel_depth: Some(DEFAULT_CHANNEL_DEPTH),
            variant: Some(PipelineVariant::default()),
            read_mode: Some(ReadMode::default()),
            padding: Some(Padding::default()),
            run_mode: Some(RunMode::default()),
            watchdog_ticks: None,
            clock_mhz: Some(DEFAULT_CLOCK_MHZ),
            stdout_level: Some(log::Level::Info),
            filter_regex: Some(String::new()),
            log_file: None,
            log_level: Some(log::Level::Trace),
        }
    }
}

macro_rules! merge_fields {
    ($config:ident, $cli:ident ; $($field:ident),*) => {
        $(
            if $cli.$field.is_some() {
                $config.$field = $cli.$field;
            }
        )*
    };
}

impl DemoConfig {
    /// Parse the command line and merge it over every other source.
    pub fn parse_all_sources() -> Result<Self, figment::Error> {
        Self::from_cli(Self::parse())
    }

    /// Merge `cli` over the defaults, the config file and the environment.
    pub fn from_cli(cli: Self) -> Result<Self, figment::Error> {
        let mut figment = Self::figment_with_defaults();
        if let Some(conf_file) = &cli.config_file {
            figment = Self::figment_conf_file_merge(figment, conf_file);
        }
        figment = Self::figment_env_var_merge(figment);
        let config: Self = figment.extract()?;
        Ok(config.clap_merge(cli))
    }

    fn figment_with_defaults() -> Figment {
        Figment::new().merge(Serialized::defaults(Self::default()))
    }

    fn figment_conf_file_merge(config: Figment, conf_file: &PathBuf) -> Figment {
        config.merge(Toml::file(conf_file))
    }

    fn figment_env_var_merge(config: Figment) -> Figment {
        config.merge(Env::prefixed(ENV_PREFIX))
    }

    fn clap_merge(mut self, cli: Self) -> Self {
        merge_fields!(self, cli ;
            config_file, num_elements, lanes, channel_depth, variant, read_mode, padding,
            run_mode, watchdog_ticks, clock_mhz, stdout_level, filter_regex, log_file,
            log_level);
        self
    }

    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            lanes: self.lanes.unwrap_or(defaults.lanes),
            channel_depth: self.channel_depth.unwrap_or(defaults.channel_depth),
            variant: self.variant.unwrap_or(defaults.variant),
            read_mode: self.read_mode.unwrap_or(defaults.read_mode),
            padding: self.padding.unwrap_or(defaults.padding),
            run_mode: self.run_mode.unwrap_or(defaults.run_mode),
            watchdog_ticks: self.watchdog_ticks.or(defaults.watchdog_ticks),
        }
    }

    /// The elements `0..num_elements`.
    #[must_use]
    pub fn input(&self) -> Vec<Element> {
        let num_elements = self.num_elements.unwrap_or(DEFAULT_NUM_ELEMENTS);
        (0..num_elements as Element).collect()
    }

    #[must_use]
    pub fn clock_mhz(&self) -> f64 {
        self.clock_mhz.unwrap_or(DEFAULT_CLOCK_MHZ)
    }
}
