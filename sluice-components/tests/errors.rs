// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use sluice_components::sink::Sink;
use sluice_components::source::Source;
use sluice_components::{connect_port, option_box_repeat};
use sluice_engine::test_helpers::start_test;

#[test]
#[should_panic(expected = "top::source::tx already connected")]
fn connect_outport_twice() {
    let engine = start_test(file!());
    let clock = engine.default_clock();

    let top = engine.top();
    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 1))
            .unwrap();

    let sink1 = Sink::new_and_register(&engine, &clock, top, "sink1", 1, None).unwrap();
    let sink2 = Sink::new_and_register(&engine, &clock, top, "sink2", 1, None).unwrap();

    connect_port!(source, tx => sink1, rx).unwrap();
    connect_port!(source, tx => sink2, rx).unwrap();
}

#[test]
#[should_panic(expected = "top::sink::rx already connected")]
fn connect_inport_twice() {
    let engine = start_test(file!());
    let clock = engine.default_clock();

    let top = engine.top();
    let source1 =
        Source::new_and_register(&engine, &clock, top, "source1", option_box_repeat!(1_u64 ; 1))
            .unwrap();
    let source2 =
        Source::new_and_register(&engine, &clock, top, "source2", option_box_repeat!(1_u64 ; 1))
            .unwrap();

    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 1, None).unwrap();

    connect_port!(source1, tx => sink, rx).unwrap();
    connect_port!(source2, tx => sink, rx).unwrap();
}

#[test]
fn zero_depth_sink_rejected() {
    let engine = start_test(file!());
    let clock = engine.default_clock();

    let result = Sink::<u64>::new_and_register(&engine, &clock, engine.top(), "sink", 0, None);
    match result {
        Err(e) => assert_eq!(
            e.to_string(),
            "Error: top::sink::rx: unsupported channel with 0 depth"
        ),
        Ok(_) => panic!("zero depth accepted"),
    }
}

#[test]
#[should_panic(expected = "top::source::tx not connected")]
fn unconnected_source_fails() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let _source = Source::new_and_register(
        &engine,
        &clock,
        engine.top(),
        "source",
        option_box_repeat!(1_u64 ; 1),
    )
    .unwrap();
    sluice_engine::run_simulation!(engine);
}
