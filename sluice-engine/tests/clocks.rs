// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::rc::Rc;

use sluice_engine::run_simulation;
use sluice_engine::test_helpers::start_test;

#[test]
fn wait_advances_time() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    engine.spawn(async move {
        clock.wait_ticks(3).await;
        clock.wait_ticks(0).await;
        clock.wait_ticks(7).await;
        assert_eq!(clock.tick_now(), 10);
        Ok(())
    });
    run_simulation!(engine);
    assert_eq!(engine.time_now_ns(), 10.0);
}

#[test]
fn slow_clock_ticks_are_longer() {
    let mut engine = start_test(file!());
    let clock = engine.clock_mhz(250.0);

    engine.spawn(async move {
        clock.wait_ticks(2).await;
        Ok(())
    });
    run_simulation!(engine);
    assert_eq!(engine.time_now_ns(), 8.0);
}

#[test]
fn background_task_does_not_keep_simulation_alive() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let polls = Rc::new(RefCell::new(0));
    {
        let polls = polls.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            for _ in 0..1000 {
                *polls.borrow_mut() += 1;
                clock.wait_ticks_or_exit(1).await;
            }
            Ok(())
        });
    }
    engine.spawn(async move {
        clock.wait_ticks(5).await;
        Ok(())
    });

    run_simulation!(engine);
    assert_eq!(engine.time_now_ns(), 5.0);
    assert_eq!(*polls.borrow(), 6);
    assert_eq!(engine.num_pending_tasks(), 1);
}

#[test]
fn tasks_woken_at_same_tick_run_together() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let order = Rc::new(RefCell::new(Vec::new()));
    for (name, ticks) in [("a", 3_u64), ("b", 1), ("c", 3)] {
        let order = order.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            clock.wait_ticks(ticks).await;
            order.borrow_mut().push((name, clock.tick_now()));
            Ok(())
        });
    }
    run_simulation!(engine);
    assert_eq!(*order.borrow(), vec![("b", 1), ("a", 3), ("c", 3)]);
}
