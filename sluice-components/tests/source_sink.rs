// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use sluice_components::sink::Sink;
use sluice_components::source::{Exhaustion, Source};
use sluice_components::{connect_port, option_box_iter, option_box_repeat};
use sluice_engine::run_simulation;
use sluice_engine::test_helpers::start_test;
use sluice_engine::traits::Event;

#[test]
fn all_values_arrive_in_order() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_iter!(0..20_u64))
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 4, None).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    run_simulation!(engine);

    assert_eq!(source.num_sourced(), 20);
    assert_eq!(sink.take_sunk(), (0..20).collect::<Vec<u64>>());
    assert_eq!(sink.num_sunk(), 0);
    assert_eq!(engine.num_pending_tasks(), 0);
}

#[test]
fn one_value_per_tick() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(7_u64 ; 10))
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 1, Some(10)).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    run_simulation!(engine);

    // The first value is written at tick 0 and read at tick 1.
    assert_eq!(sink.completed_at(), Some(10));
    assert!(sink.done().is_triggered());
}

#[test]
fn unlimited_sink_finishes_on_close() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 3))
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, None).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    run_simulation!(engine);

    assert_eq!(sink.num_sunk(), 3);
    // The closure is only seen on the read after the last value.
    assert_eq!(sink.completed_at(), Some(4));
}

#[test]
fn empty_generator_closes_immediately() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source = Source::<u64>::new_and_register(&engine, &clock, top, "source", None).unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, None).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    run_simulation!(engine);

    assert_eq!(sink.num_sunk(), 0);
    assert_eq!(sink.completed_at(), Some(0));
    assert_eq!(engine.num_pending_tasks(), 0);
}

#[test]
fn limit_larger_than_stream_never_completes() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 3))
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, Some(5)).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    run_simulation!(engine);

    assert_eq!(sink.num_sunk(), 3);
    assert_eq!(sink.completed_at(), None);
    assert!(!sink.done().is_triggered());
}

#[test]
fn held_source_stops_at_done() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 4))
            .unwrap();
    source.set_exhaustion(Exhaustion::Hold);
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, Some(4)).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    engine.run_until(Box::new(sink.done())).unwrap();

    assert_eq!(sink.num_sunk(), 4);
    assert_eq!(sink.completed_at(), Some(4));
    // The source never lets go of its channel.
    assert_eq!(engine.num_pending_tasks(), 1);
}

#[test]
fn held_source_keeps_channel_open() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 4))
            .unwrap();
    source.set_exhaustion(Exhaustion::Hold);
    // Without a limit the sink only finishes if the channel closes.
    let sink = Sink::<u64>::new_and_register(&engine, &clock, top, "sink", 2, None).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    let stop = sluice_engine::events::once::Once::default();
    {
        let stop = stop.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            clock.wait_ticks(10).await;
            stop.notify()
        });
    }
    engine.run_until(Box::new(stop)).unwrap();

    assert_eq!(sink.num_sunk(), 4);
    assert_eq!(sink.completed_at(), None);
    assert_eq!(engine.num_pending_tasks(), 2);
}

#[test]
fn done_can_be_listened_to() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();
    let top = engine.top();

    let source =
        Source::new_and_register(&engine, &clock, top, "source", option_box_repeat!(1_u64 ; 2))
            .unwrap();
    let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, Some(2)).unwrap();
    connect_port!(source, tx => sink, rx).unwrap();

    let seen_at = std::rc::Rc::new(std::cell::Cell::new(None));
    {
        let seen_at = seen_at.clone();
        let done = sink.done();
        let clock = clock.clone();
        engine.spawn(async move {
            done.listen().await;
            seen_at.set(Some(clock.tick_now()));
            Ok(())
        });
    }

    run_simulation!(engine);
    assert_eq!(seen_at.get(), Some(2));
}
