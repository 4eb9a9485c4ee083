// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::flit::{DEFAULT_LANES, Padding};
use crate::kernel::ReadMode;

/// Default depth of every channel in the pipeline.
pub const DEFAULT_CHANNEL_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineVariant {
    /// One kernel computes the whole prefix sum each tick.
    #[default]
    SingleStage,

    /// Kernel A computes partial sums and kernel B applies them, one tick
    /// apart.
    TwoStage,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// The source closes its channel when the input is exhausted and every
    /// unit shuts down in turn.
    #[default]
    Bounded,

    /// The source keeps its channel open and the kernels never stop. The
    /// simulation is halted once the sink has everything it expects.
    FreeRunning,
}

/// Everything needed to build a prefix-sum pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Elements per flit.
    pub lanes: usize,

    /// Capacity of every channel, in records.
    pub channel_depth: usize,

    pub variant: PipelineVariant,
    pub read_mode: ReadMode,
    pub padding: Padding,
    pub run_mode: RunMode,

    /// Fail the run if the sink is not done after this many ticks.
    pub watchdog_ticks: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            lanes: DEFAULT_LANES,
            channel_depth: DEFAULT_CHANNEL_DEPTH,
            variant: PipelineVariant::default(),
            read_mode: ReadMode::default(),
            padding: Padding::default(),
            run_mode: RunMode::default(),
            watchdog_ticks: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.lanes == 0 {
            return Err(PipelineError::Configuration(
                "lanes must be at least 1".to_string(),
            ));
        }
        if self.channel_depth == 0 {
            return Err(PipelineError::Configuration(
                "channel depth must be at least 1".to_string(),
            ));
        }
        if self.watchdog_ticks == Some(0) {
            return Err(PipelineError::Configuration(
                "watchdog budget must be at least 1 tick".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.lanes, 8);
        assert_eq!(config.channel_depth, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_values() {
        for config in [
            PipelineConfig {
                lanes: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                channel_depth: 0,
                ..PipelineConfig::default()
            },
            PipelineConfig {
                watchdog_ticks: Some(0),
                ..PipelineConfig::default()
            },
        ] {
            assert!(matches!(
                config.validate(),
                Err(PipelineError::Configuration(_))
            ));
        }
    }
}
