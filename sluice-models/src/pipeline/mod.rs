// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Building and driving a complete prefix-sum pipeline.
//!
//! A pipeline is wired once, before anything runs:
//!
//! ```text
//!  single-stage:  source -> prefix_sum -> sink
//!
//!  two-stage:     source -> prefix_sum_a -data-> prefix_sum_b -> sink
//!                                        -sum-->
//! ```
//!
//! Every channel has the configured depth. A depth of one is enough for
//! either variant to stream one flit per tick: a full channel is emptied by
//! its consumer within the same tick in which the producer wants to write
//! again.

use std::rc::Rc;

use sluice_components::connect_port;
use sluice_components::sink::Sink;
use sluice_components::source::{Exhaustion, Source};
use sluice_engine::engine::Engine;
use sluice_engine::time::clock::Clock;
use sluice_track::entity::GetEntity;
use sluice_track::tracker::stdout_tracker;
use sluice_track::{Tracker, debug, info};

mod config;
mod summary;
pub mod watchdog;

pub use config::{DEFAULT_CHANNEL_DEPTH, PipelineConfig, PipelineVariant, RunMode};
pub use summary::RunSummary;

use crate::errors::PipelineError;
use crate::flit::{Element, Flit, FlitPacker, num_flits, unpack};
use crate::prefix_sum::PrefixSum;
use crate::prefix_sum_split::{PrefixSumA, PrefixSumB};
use crate::reference;
use watchdog::Watchdog;

/// Default clock frequency of the pipeline, in MHz.
pub const DEFAULT_CLOCK_MHZ: f64 = 1000.0;

/// What a run needs from its environment.
#[derive(Clone)]
pub struct ExecutionContext {
    pub tracker: Tracker,
    pub clock_mhz: f64,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            clock_mhz: DEFAULT_CLOCK_MHZ,
        }
    }

    #[must_use]
    pub fn with_clock_mhz(mut self, clock_mhz: f64) -> Self {
        self.clock_mhz = clock_mhz;
        self
    }
}

/// Warnings and errors go to stdout.
impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(stdout_tracker(log::Level::Warn))
    }
}

enum Kernels {
    SingleStage(Rc<PrefixSum>),
    TwoStage(Rc<PrefixSumA>, Rc<PrefixSumB>),
}

impl Kernels {
    fn bubbles(&self) -> u64 {
        match self {
            Kernels::SingleStage(kernel) => kernel.bubbles(),
            Kernels::TwoStage(a, b) => a.bubbles() + b.bubbles(),
        }
    }
}

/// Fail unless a producer and consumer agree on the flit width.
pub fn check_flit_width(
    producer: &str,
    producer_lanes: usize,
    consumer: &str,
    consumer_lanes: usize,
) -> Result<(), PipelineError> {
    if producer_lanes != consumer_lanes {
        return Err(PipelineError::Configuration(format!(
            "{producer} produces {producer_lanes}-lane flits but {consumer} expects {consumer_lanes}"
        )));
    }
    Ok(())
}

pub struct PrefixSumPipeline {
    engine: Engine,
    clock: Clock,
    config: PipelineConfig,
    num_elements: usize,
    num_flits: usize,
    source: Rc<Source<Flit>>,
    kernels: Kernels,
    sink: Rc<Sink<Flit>>,
    watchdog: Option<Rc<Watchdog>>,
}

impl PrefixSumPipeline {
    /// Create and connect every unit of the pipeline.
    ///
    /// Any configuration problem is reported here, before a single tick has
    /// been simulated.
    pub fn build(
        ctx: &ExecutionContext,
        config: &PipelineConfig,
        input: Vec<Element>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        if !(ctx.clock_mhz.is_finite() && ctx.clock_mhz > 0.0) {
            return Err(PipelineError::Configuration(format!(
                "clock frequency must be a positive number of MHz, got {}",
                ctx.clock_mhz
            )));
        }
        let num_elements = input.len();
        let num_flits = num_flits(num_elements, config.lanes, config.padding)?;

        let engine = Engine::new(&ctx.tracker);
        let clock = engine.clock_mhz(ctx.clock_mhz);
        let top = engine.top();
        let lanes = config.lanes;
        let depth = config.channel_depth;

        let source = Source::<Flit>::new_and_register(&engine, &clock, top, "source", None)?;
        let packer = FlitPacker::new(source.entity(), input, lanes, config.padding)?;
        source.set_generator(Some(Box::new(packer)));
        if config.run_mode == RunMode::FreeRunning {
            source.set_exhaustion(Exhaustion::Hold);
        }

        let kernels = match config.variant {
            PipelineVariant::SingleStage => {
                let kernel = PrefixSum::new_and_register(
                    &engine,
                    &clock,
                    top,
                    "prefix_sum",
                    lanes,
                    depth,
                    config.read_mode,
                )?;
                check_flit_width("source", lanes, "prefix_sum", kernel.lanes())?;
                Kernels::SingleStage(kernel)
            }
            PipelineVariant::TwoStage => {
                let a = PrefixSumA::new_and_register(
                    &engine,
                    &clock,
                    top,
                    "prefix_sum_a",
                    lanes,
                    depth,
                    config.read_mode,
                )?;
                let b = PrefixSumB::new_and_register(
                    &engine,
                    &clock,
                    top,
                    "prefix_sum_b",
                    lanes,
                    depth,
                    config.read_mode,
                )?;
                check_flit_width("source", lanes, "prefix_sum_a", a.lanes())?;
                check_flit_width("prefix_sum_a", a.lanes(), "prefix_sum_b", b.lanes())?;
                Kernels::TwoStage(a, b)
            }
        };

        let sink = Sink::new_and_register(&engine, &clock, top, "sink", depth, Some(num_flits))?;

        match &kernels {
            Kernels::SingleStage(kernel) => {
                connect_port!(source, tx => kernel, rx)?;
                connect_port!(kernel, tx => sink, rx)?;
            }
            Kernels::TwoStage(a, b) => {
                connect_port!(source, tx => a, rx)?;
                connect_port!(a, sum_tx => b, sum_rx)?;
                connect_port!(a, data_tx => b, data_rx)?;
                connect_port!(b, tx => sink, rx)?;
            }
        }

        let watchdog = match config.watchdog_ticks {
            Some(budget) => Some(Watchdog::new_and_register(
                &engine,
                &clock,
                top,
                "watchdog",
                budget,
                sink.done(),
            )?),
            None => None,
        };

        debug!(top ; "built {:?} pipeline: {} elements in {} flits of {} lanes, depth {}",
            config.variant, num_elements, num_flits, lanes, depth);

        Ok(Self {
            engine,
            clock,
            config: config.clone(),
            num_elements,
            num_flits,
            source,
            kernels,
            sink,
            watchdog,
        })
    }

    #[must_use]
    pub fn num_flits(&self) -> usize {
        self.num_flits
    }

    /// Run the pipeline until the sink has every flit, or nothing more can
    /// happen.
    pub fn run(mut self) -> Result<RunSummary, PipelineError> {
        let result = match self.config.run_mode {
            RunMode::Bounded => self.engine.run(),
            RunMode::FreeRunning => self.engine.run_until(Box::new(self.sink.done())),
        };

        let tick = self.clock.tick_now();
        let watchdog_running = self.watchdog.as_ref().is_some_and(|w| w.is_running());
        let pending_units = self.engine.num_pending_tasks() - usize::from(watchdog_running);
        let collected = self.sink.num_sunk();

        if let Err(e) = result {
            return match &self.watchdog {
                Some(watchdog) if watchdog.expired() => Err(PipelineError::Deadlock {
                    collected,
                    expected: self.num_flits,
                    tick: watchdog.budget_ticks(),
                    pending_units,
                    watchdog: Some(watchdog.budget_ticks()),
                }),
                _ => Err(e.into()),
            };
        }

        if collected < self.num_flits {
            return Err(PipelineError::Deadlock {
                collected,
                expected: self.num_flits,
                tick,
                pending_units,
                watchdog: None,
            });
        }

        let ticks = self.sink.completed_at().unwrap_or(tick);
        let outputs = unpack(self.sink.take_sunk(), self.num_elements, self.config.lanes)?;
        info!(self.engine.top() ; "{} flits from {} through the pipeline in {} ticks",
            self.num_flits, self.source, ticks);

        Ok(RunSummary {
            outputs,
            ticks,
            flits: self.num_flits,
            pending_units,
            bubbles: self.kernels.bubbles(),
            lanes: self.config.lanes,
            clock_mhz: self.clock.freq_mhz(),
        })
    }
}

/// Build and run a pipeline, then check its output against the reference.
pub fn run_and_verify(
    ctx: &ExecutionContext,
    config: &PipelineConfig,
    input: &[Element],
) -> Result<RunSummary, PipelineError> {
    let expected = reference::prefix_sum(input);
    let summary = PrefixSumPipeline::build(ctx, config, input.to_vec())?.run()?;
    reference::verify(&expected, &summary.outputs)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flit_widths_must_agree() {
        assert!(check_flit_width("a", 4, "b", 4).is_ok());
        let err = check_flit_width("a", 4, "b", 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: a produces 4-lane flits but b expects 2"
        );
    }

    #[test]
    fn build_counts_flits() {
        let config = PipelineConfig {
            lanes: 4,
            ..PipelineConfig::default()
        };
        let pipeline =
            PrefixSumPipeline::build(&ExecutionContext::default(), &config, (0..10).collect())
                .unwrap();
        assert_eq!(pipeline.num_flits(), 3);
    }

    #[test]
    fn missing_flits_reported_as_deadlock() {
        let config = PipelineConfig {
            lanes: 2,
            ..PipelineConfig::default()
        };
        let mut pipeline =
            PrefixSumPipeline::build(&ExecutionContext::default(), &config, vec![1, 2, 3, 4])
                .unwrap();
        // Expect one more flit than the source will ever produce.
        pipeline.num_flits += 1;
        assert_eq!(
            pipeline.run(),
            Err(PipelineError::Deadlock {
                collected: 2,
                expected: 3,
                tick: 3,
                pending_units: 0,
                watchdog: None,
            })
        );
    }
}
