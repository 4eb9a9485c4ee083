// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use sluice_engine::channel::{InPort, OutPort};
use sluice_engine::run_simulation;
use sluice_engine::test_helpers::start_test;

#[test]
#[should_panic(expected = "top::tx not connected")]
fn disconnected_outport() {
    let mut engine = start_test(file!());

    let tx_port = OutPort::new(engine.top(), "tx");
    engine.spawn(async move {
        tx_port.put(1_u64)?.await?;
        Ok(())
    });
    run_simulation!(engine);
}

#[test]
#[should_panic(expected = "top::rx not connected")]
fn disconnected_input() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let rx_port = InPort::new(&clock, engine.top(), "rx", 1).unwrap();
    engine.spawn(async move {
        let _: Option<u64> = rx_port.get()?.await;
        Ok(())
    });
    run_simulation!(engine);
}

#[test]
#[should_panic(expected = "top::rx not connected")]
fn disconnected_input_try_get() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let rx_port = InPort::<u64>::new(&clock, engine.top(), "rx", 1).unwrap();
    engine.spawn(async move {
        rx_port.try_get()?;
        Ok(())
    });
    run_simulation!(engine);
}

#[test]
fn second_producer_rejected() {
    let engine = start_test(file!());
    let clock = engine.default_clock();

    let rx = InPort::<u64>::new(&clock, engine.top(), "rx", 2).unwrap();
    let mut first = OutPort::new(engine.top(), "first");
    let mut second = OutPort::new(engine.top(), "second");
    first.connect(rx.state()).unwrap();

    let err = second.connect(rx.state()).unwrap_err();
    assert_eq!(err.to_string(), "Error: top::rx already connected");
}

#[test]
fn producer_connected_twice_rejected() {
    let engine = start_test(file!());
    let clock = engine.default_clock();

    let rx_a = InPort::<u64>::new(&clock, engine.top(), "rx_a", 2).unwrap();
    let rx_b = InPort::<u64>::new(&clock, engine.top(), "rx_b", 2).unwrap();
    let mut tx = OutPort::new(engine.top(), "tx");
    tx.connect(rx_a.state()).unwrap();

    let err = tx.connect(rx_b.state()).unwrap_err();
    assert_eq!(err.to_string(), "Error: top::tx already connected");
}
