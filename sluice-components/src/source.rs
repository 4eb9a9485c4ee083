// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A data source.
//!
//! The data source writes one value per tick as produced by the
//! [DataGenerator] that is provided.
//!
//! # Ports
//!
//! This component has one port:
//!  - One [output port](sluice_engine::channel::OutPort): `tx`

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use async_trait::async_trait;
use sluice_engine::channel::{ChannelStateResult, OutPort};
use sluice_engine::engine::Engine;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::{Runnable, SimObject};
use sluice_engine::types::{SimError, SimResult};
use sluice_model_builder::{EntityDisplay, EntityGet};
use sluice_track::entity::Entity;
use sluice_track::{debug, exit};

use crate::types::DataGenerator;
use crate::{connect_tx, take_option};

#[macro_export]
/// Build an optional [DataGenerator] repeating `value` a fixed number of times.
macro_rules! option_box_repeat {
    ($value:expr ; $repeat:expr) => {
        Some(Box::new(std::iter::repeat($value).take($repeat)))
    };
}

#[macro_export]
/// Build an optional [DataGenerator] from anything iterable.
macro_rules! option_box_iter {
    ($values:expr) => {
        Some(Box::new($values.into_iter()))
    };
}

/// What a [`Source`] does with its channel once the generator is exhausted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Exhaustion {
    /// Drop the channel so that downstream units see it close.
    #[default]
    Close,

    /// Keep the channel open forever. Downstream units never terminate and
    /// the simulation has to be halted by other means.
    Hold,
}

#[derive(EntityDisplay, EntityGet)]
pub struct Source<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    clock: Clock,
    data_generator: RefCell<Option<DataGenerator<T>>>,
    exhaustion: Cell<Exhaustion>,
    num_sourced: Cell<usize>,
    tx: RefCell<Option<OutPort<T>>>,
}

impl<T> Source<T>
where
    T: SimObject,
{
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        data_generator: Option<DataGenerator<T>>,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        let tx = OutPort::new(&entity, "tx");
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            data_generator: RefCell::new(data_generator),
            exhaustion: Cell::new(Exhaustion::default()),
            num_sourced: Cell::new(0),
            tx: RefCell::new(Some(tx)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn set_generator(&self, data_generator: Option<DataGenerator<T>>) {
        *self.data_generator.borrow_mut() = data_generator;
    }

    pub fn set_exhaustion(&self, exhaustion: Exhaustion) {
        self.exhaustion.set(exhaustion);
    }

    pub fn connect_port_tx(&self, port_state: ChannelStateResult<T>) -> SimResult {
        connect_tx!(self.tx, connect ; port_state)
    }

    #[must_use]
    pub fn num_sourced(&self) -> usize {
        self.num_sourced.get()
    }
}

#[async_trait(?Send)]
impl<T> Runnable for Source<T>
where
    T: SimObject,
{
    async fn run(&self) -> SimResult {
        let tx = take_option!(self.tx);
        let data_generator = self.data_generator.borrow_mut().take();
        if let Some(data_generator) = data_generator {
            for value in data_generator {
                exit!(self.entity ; value.id());
                tx.put(value)?.await?;
                self.num_sourced.set(self.num_sourced.get() + 1);
                self.clock.wait_ticks(1).await;
            }
        }

        debug!(self.entity ; "exhausted after {} values", self.num_sourced());
        if self.exhaustion.get() == Exhaustion::Hold {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
