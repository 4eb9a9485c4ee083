// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::Cell;
use std::rc::Rc;

use sluice_engine::events::once::Once;
use sluice_engine::test_helpers::start_test;

#[test]
fn stops_when_event_fires() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let done = Once::default();
    {
        let done = done.clone();
        let clock = clock.clone();
        engine.spawn(async move {
            clock.wait_ticks(20).await;
            done.notify()
        });
    }
    // A task that outlives the event
    engine.spawn(async move {
        for _ in 0..1000 {
            clock.wait_ticks(1).await;
        }
        Ok(())
    });

    engine.run_until(Box::new(done.clone())).unwrap();
    assert_eq!(engine.time_now_ns(), 20.0);
    assert!(done.is_triggered());
    assert_eq!(engine.num_pending_tasks(), 1);
}

struct DropFlag(Rc<Cell<bool>>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.set(true);
    }
}

#[test]
fn parked_task_survives_the_run() {
    let mut engine = start_test(file!());
    let clock = engine.default_clock();

    let dropped = Rc::new(Cell::new(false));
    let done = Once::default();
    {
        let flag = DropFlag(dropped.clone());
        engine.spawn(async move {
            let _flag = flag;
            // Parks without registering a waker anywhere.
            std::future::pending::<()>().await;
            Ok(())
        });
    }
    {
        let done = done.clone();
        engine.spawn(async move {
            clock.wait_ticks(3).await;
            done.notify()
        });
    }

    engine.run_until(Box::new(done)).unwrap();
    assert_eq!(engine.num_pending_tasks(), 1);
    assert!(!dropped.get());
}

#[test]
fn notify_twice_is_an_error() {
    let done = Once::default();
    done.notify().unwrap();
    assert!(done.notify().is_err());
}
