// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Bounds the number of ticks a run may take.

use std::cell::Cell;
use std::rc::Rc;

use async_trait::async_trait;
use futures::{FutureExt, select_biased};
use sluice_engine::engine::Engine;
use sluice_engine::events::once::Once;
use sluice_engine::sim_error;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::{Event, Runnable};
use sluice_engine::types::{SimError, SimResult};
use sluice_model_builder::{EntityDisplay, EntityGet};
use sluice_track::entity::Entity;
use sluice_track::warn;

#[derive(EntityGet, EntityDisplay)]
pub struct Watchdog {
    pub entity: Rc<Entity>,
    clock: Clock,
    budget_ticks: u64,
    done: Once,
    expired: Cell<bool>,
    finished: Cell<bool>,
}

impl Watchdog {
    /// Fail the simulation unless `done` fires within `budget_ticks`.
    ///
    /// The budget is inclusive: a run whose last flit arrives on tick
    /// `budget_ticks` passes.
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        budget_ticks: u64,
        done: Once,
    ) -> Result<Rc<Self>, SimError> {
        let rc_self = Rc::new(Self {
            entity: Rc::new(Entity::new(parent, name)),
            clock: clock.clone(),
            budget_ticks,
            done,
            expired: Cell::new(false),
            finished: Cell::new(false),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    #[must_use]
    pub fn budget_ticks(&self) -> u64 {
        self.budget_ticks
    }

    #[must_use]
    pub fn expired(&self) -> bool {
        self.expired.get()
    }

    /// True while the watchdog is still counting.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.finished.get()
    }
}

#[async_trait(?Send)]
impl Runnable for Watchdog {
    async fn run(&self) -> SimResult {
        // Wake at the start of the following tick, before any unit has done
        // that tick's work. This wait is registered first so it is polled
        // first.
        let mut timeout = self
            .clock
            .wait_ticks_or_exit(self.budget_ticks.saturating_add(1))
            .fuse();
        let mut done = self.done.listen().fuse();
        let expired = select_biased! {
            _ = done => false,
            _ = timeout => true,
        };
        self.finished.set(true);
        if expired {
            self.expired.set(true);
            warn!(self.entity ; "expired after {} ticks", self.budget_ticks);
            return sim_error!(format!(
                "{}: expired after {} ticks",
                self.entity, self.budget_ticks
            ));
        }
        Ok(())
    }
}
