// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Release;

use sluice_track::Tracker;
use sluice_track::entity::{Entity, toplevel};
use sluice_track::tracker::stdout_tracker;

use crate::executor::{self, Executor, Spawner};
use crate::time::clock::Clock;
use crate::types::{Component, Eventable, SimResult};

/// Use a default clock frequency of 1GHz.
const DEFAULT_CLOCK_MHZ: f64 = 1000.0;

pub struct Engine {
    pub executor: Executor,
    pub spawner: Spawner,
    toplevel: Rc<Entity>,
    tracker: Tracker,
    registered: RefCell<Vec<Component>>,
}

impl Engine {
    /// Create a standalone engine.
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        let (executor, spawner) = executor::new_executor_and_spawner(&toplevel);
        Self {
            executor,
            spawner,
            toplevel,
            tracker: tracker.clone(),
            registered: RefCell::new(Vec::new()),
        }
    }

    /// Register a component whose `run` is spawned when the simulation starts.
    pub fn register(&self, component: Component) {
        self.registered.borrow_mut().push(component);
    }

    fn spawn_registered(&self) {
        for component in self.registered.borrow_mut().drain(..) {
            self.executor.spawn(async move { component.run().await });
        }
    }

    /// Run until every task has completed or is blocked with no way to make
    /// progress.
    pub fn run(&mut self) -> SimResult {
        self.spawn_registered();
        // Pass an atomic bool that will never be set to true
        let finished = Rc::new(AtomicBool::new(false));
        self.executor.run(&finished)
    }

    /// Run until `event` fires, leaving any other task where it is.
    pub fn run_until<T: Copy + 'static>(&mut self, event: Eventable<T>) -> SimResult {
        self.spawn_registered();
        let finished = Rc::new(AtomicBool::new(false));
        {
            let finished = finished.clone();
            self.executor.spawn(async move {
                event.listen().await;
                finished.store(true, Release);
                Ok(())
            });
        }

        self.executor.run(&finished)
    }

    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.executor.spawn(future);
    }

    #[must_use]
    pub fn default_clock(&self) -> Clock {
        self.executor.get_clock(DEFAULT_CLOCK_MHZ)
    }

    #[must_use]
    pub fn clock_mhz(&self, freq_mhz: f64) -> Clock {
        self.executor.get_clock(freq_mhz)
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.executor.time_now_ns()
    }

    /// Number of spawned tasks (including registered components) that have
    /// not completed.
    #[must_use]
    pub fn num_pending_tasks(&self) -> usize {
        self.executor.num_pending_tasks()
    }

    #[must_use]
    pub fn top(&self) -> &Rc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

/// Create a default engine that sends [`Track`](sluice_track::Track) events to
/// stdout.
impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Warn);
        Self::new(&tracker)
    }
}
