// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A data sink.
//!
//! The sink reads at most one value per tick and keeps everything it reads.
//! With a limit it stops once that many values have arrived; without one it
//! runs until its channel closes. Either way its `done` event fires when it
//! finishes normally.
//!
//! # Ports
//!
//! This component has one port:
//!  - One [input port](sluice_engine::channel::InPort): `rx`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use sluice_engine::channel::{ChannelStateResult, InPort};
use sluice_engine::engine::Engine;
use sluice_engine::events::once::Once;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::{Runnable, SimObject};
use sluice_engine::types::{SimError, SimResult};
use sluice_model_builder::{EntityDisplay, EntityGet};
use sluice_track::entity::Entity;
use sluice_track::{debug, enter, warn};

use crate::{port_rx, take_option};

#[derive(EntityDisplay, EntityGet)]
pub struct Sink<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    clock: Clock,
    limit: Option<usize>,
    sunk: RefCell<Vec<T>>,
    done: Once,
    completed_at: Cell<Option<u64>>,
    rx: RefCell<Option<InPort<T>>>,
}

impl<T> Sink<T>
where
    T: SimObject,
{
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        depth: usize,
        limit: Option<usize>,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        let rx = InPort::new(clock, &entity, "rx", depth)?;
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            limit,
            sunk: RefCell::new(Vec::new()),
            done: Once::default(),
            completed_at: Cell::new(None),
            rx: RefCell::new(Some(rx)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn port_rx(&self) -> ChannelStateResult<T> {
        port_rx!(self.rx, state)
    }

    #[must_use]
    pub fn num_sunk(&self) -> usize {
        self.sunk.borrow().len()
    }

    /// Remove and return everything received so far.
    pub fn take_sunk(&self) -> Vec<T> {
        std::mem::take(&mut *self.sunk.borrow_mut())
    }

    /// Event that fires when the sink has finished.
    #[must_use]
    pub fn done(&self) -> Once {
        self.done.clone()
    }

    /// Tick at which the sink finished, if it has.
    #[must_use]
    pub fn completed_at(&self) -> Option<u64> {
        self.completed_at.get()
    }

    fn finish(&self) -> SimResult {
        let now = self.clock.tick_now();
        debug!(self.entity ; "done with {} values at tick {}", self.num_sunk(), now);
        self.completed_at.set(Some(now));
        self.done.notify()
    }

    fn reached_limit(&self) -> bool {
        self.limit.is_some_and(|limit| self.num_sunk() >= limit)
    }
}

#[async_trait(?Send)]
impl<T> Runnable for Sink<T>
where
    T: SimObject,
{
    async fn run(&self) -> SimResult {
        let rx = take_option!(self.rx);
        if self.reached_limit() {
            return self.finish();
        }

        while let Some(value) = rx.get()?.await {
            enter!(self.entity ; value.id());
            self.sunk.borrow_mut().push(value);
            if self.reached_limit() {
                return self.finish();
            }
            self.clock.wait_ticks(1).await;
        }

        match self.limit {
            None => self.finish(),
            Some(limit) => {
                warn!(self.entity ; "channel closed after {} of {} values", self.num_sunk(), limit);
                Ok(())
            }
        }
    }
}
