// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use sluice_components::connect_port;
use sluice_components::sink::Sink;
use sluice_components::source::Source;
use sluice_engine::test_helpers::start_test;
use sluice_models::errors::PipelineError;
use sluice_models::flit::{Flit, Padding};
use sluice_models::kernel::ReadMode;
use sluice_models::pipeline::{
    ExecutionContext, PipelineConfig, PipelineVariant, PrefixSumPipeline, RunMode, run_and_verify,
};
use sluice_models::prefix_sum::PrefixSum;
use sluice_models::prefix_sum_split::PrefixSumA;
use sluice_track::entity::GetEntity;
use sluice_track::test_helpers::create_tracker;

fn context() -> ExecutionContext {
    ExecutionContext::new(create_tracker(file!()))
}

#[test]
fn zero_depth_rejected() {
    let config = PipelineConfig {
        channel_depth: 0,
        variant: PipelineVariant::TwoStage,
        ..PipelineConfig::default()
    };
    let result = PrefixSumPipeline::build(&context(), &config, vec![1, 2, 3]);
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[test]
fn clock_must_be_positive() {
    for clock_mhz in [0.0, -100.0, f64::NAN] {
        let ctx = context().with_clock_mhz(clock_mhz);
        let result = PrefixSumPipeline::build(&ctx, &PipelineConfig::default(), vec![1, 2, 3]);
        match result {
            Err(PipelineError::Configuration(msg)) => assert!(msg.starts_with("clock frequency")),
            Err(e) => panic!("unexpected {e}"),
            Ok(_) => panic!("clock of {clock_mhz} MHz accepted"),
        }
    }
}

#[test]
fn zero_lanes_rejected() {
    let config = PipelineConfig {
        lanes: 0,
        ..PipelineConfig::default()
    };
    let result = run_and_verify(&context(), &config, &[1]);
    assert!(matches!(result, Err(PipelineError::Configuration(_))));
}

#[test]
fn partial_flit_rejected() {
    let config = PipelineConfig {
        lanes: 4,
        padding: Padding::Reject,
        ..PipelineConfig::default()
    };
    let result = run_and_verify(&context(), &config, &[1, 2, 3, 4, 5]);
    match result {
        Err(PipelineError::Configuration(msg)) => {
            assert_eq!(msg, "5 elements do not fill 4-lane flits (1 left over)");
        }
        other => panic!("unexpected {other:?}"),
    }

    // Whole flits are fine.
    let summary = run_and_verify(&context(), &config, &[1, 2, 3, 4]).unwrap();
    assert_eq!(summary.outputs, vec![1, 3, 6, 10]);
}

#[test]
fn watchdog_expires() {
    let input: Vec<u64> = (0..64).collect();
    for run_mode in [RunMode::Bounded, RunMode::FreeRunning] {
        let config = PipelineConfig {
            lanes: 4,
            run_mode,
            watchdog_ticks: Some(5),
            ..PipelineConfig::default()
        };
        match run_and_verify(&context(), &config, &input) {
            Err(PipelineError::Deadlock {
                collected,
                expected,
                tick,
                watchdog,
                ..
            }) => {
                assert!(collected < expected);
                assert_eq!(expected, 16);
                assert_eq!(tick, 5);
                assert_eq!(watchdog, Some(5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
#[should_panic(expected = "received flit")]
fn kernel_rejects_wrong_width() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source = Source::<Flit>::new_and_register(&engine, &clock, top, "source", None).unwrap();
    let flits = vec![Flit::new(source.entity(), vec![1, 2, 3])];
    source.set_generator(Some(Box::new(flits.into_iter())));
    let kernel =
        PrefixSum::new_and_register(&engine, &clock, top, "kernel", 2, 1, ReadMode::Blocking)
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 1, None).unwrap();
    connect_port!(source, tx => kernel, rx).unwrap();
    connect_port!(kernel, tx => sink, rx).unwrap();

    sluice_engine::run_simulation!(engine);
}

#[test]
fn split_kernel_rejects_wrong_width_when_polling() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source = Source::<Flit>::new_and_register(&engine, &clock, top, "source", None).unwrap();
    let flits = vec![Flit::new(source.entity(), vec![1])];
    source.set_generator(Some(Box::new(flits.into_iter())));
    let a = PrefixSumA::new_and_register(&engine, &clock, top, "a", 2, 1, ReadMode::NonBlocking)
        .unwrap();
    let sums = Sink::new_and_register(&engine, &clock, top, "sums", 1, None).unwrap();
    let data = Sink::new_and_register(&engine, &clock, top, "data", 1, None).unwrap();
    connect_port!(source, tx => a, rx).unwrap();
    connect_port!(a, sum_tx => sums, rx).unwrap();
    connect_port!(a, data_tx => data, rx).unwrap();

    let err = engine.run().unwrap_err().to_string();
    assert!(err.starts_with("Error: top::a: received flit"), "{err}");
    assert!(err.ends_with("[1] with 1 lanes, expected 2"), "{err}");
    assert_eq!(sums.num_sunk(), 0);
}
