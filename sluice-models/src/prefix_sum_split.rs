// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The prefix sum split across two kernels.
//!
//! [`PrefixSumA`] has no architectural state. Each tick it reduces one input
//! flit to its partial sum, writes the partial sum to a scalar channel and
//! forwards the flit unchanged to a data channel.
//!
//! [`PrefixSumB`] holds the running total. Each tick it reads a flit from the
//! data channel and the matching partial sum from the scalar channel. The
//! output lanes are the running sums of the flit seeded with the total so
//! far, and the next total is the old total plus the partial sum, so the
//! total never has to wait for the lanes to be summed.
//!
//! Each channel preserves order, so the n'th flit read by B is always paired
//! with the n'th partial sum.
//!
//! # Ports
//!
//! [`PrefixSumA`]:
//!  - One [input port](sluice_engine::channel::InPort): `rx`
//!  - Two [output ports](sluice_engine::channel::OutPort): `sum_tx`, `data_tx`
//!
//! [`PrefixSumB`]:
//!  - Two [input ports](sluice_engine::channel::InPort): `sum_rx`, `data_rx`
//!  - One [output port](sluice_engine::channel::OutPort): `tx`

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use sluice_components::{connect_tx, port_rx, take_option};
use sluice_engine::channel::{ChannelStateResult, InPort, OutPort, TryGet};
use sluice_engine::engine::Engine;
use sluice_engine::sim_error;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::Runnable;
use sluice_engine::types::{SimError, SimResult};
use sluice_model_builder::{EntityDisplay, EntityGet};
use sluice_track::entity::Entity;
use sluice_track::trace;

use crate::flit::{Element, Flit};
use crate::kernel::{
    ArchState, Bubbles, InputGate, ReadMode, Transition, check_lanes, drive_single_input,
    next_tick,
};
use crate::prefix_sum::running_sums;

#[derive(EntityGet, EntityDisplay)]
pub struct PrefixSumA {
    pub entity: Rc<Entity>,
    clock: Clock,
    lanes: usize,
    read_mode: ReadMode,
    state: ArchState<()>,
    bubbles: Bubbles,
    rx: RefCell<Option<InPort<Flit>>>,
    sum_tx: RefCell<Option<OutPort<Element>>>,
    data_tx: RefCell<Option<OutPort<Flit>>>,
}

impl PrefixSumA {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        lanes: usize,
        depth: usize,
        read_mode: ReadMode,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        if lanes == 0 {
            return sim_error!(format!("{entity}: unsupported flits with 0 lanes"));
        }
        let rx = InPort::new(clock, &entity, "rx", depth)?;
        let sum_tx = OutPort::new(&entity, "sum_tx");
        let data_tx = OutPort::new(&entity, "data_tx");
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            lanes,
            read_mode,
            state: ArchState::new(),
            bubbles: Bubbles::default(),
            rx: RefCell::new(Some(rx)),
            sum_tx: RefCell::new(Some(sum_tx)),
            data_tx: RefCell::new(Some(data_tx)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn port_rx(&self) -> ChannelStateResult<Flit> {
        port_rx!(self.rx, state)
    }

    pub fn connect_port_sum_tx(&self, port_state: ChannelStateResult<Element>) -> SimResult {
        connect_tx!(self.sum_tx, connect ; port_state)
    }

    pub fn connect_port_data_tx(&self, port_state: ChannelStateResult<Flit>) -> SimResult {
        connect_tx!(self.data_tx, connect ; port_state)
    }

    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.state.transitions()
    }

    #[must_use]
    pub fn bubbles(&self) -> u64 {
        self.bubbles.count()
    }

    async fn fire(
        &self,
        sum_tx: &OutPort<Element>,
        data_tx: &OutPort<Flit>,
        flit: Flit,
    ) -> SimResult {
        check_lanes(&self.entity, &flit, self.lanes)?;
        let (next, partial_sum) = self.transition(self.state.current(), &flit);
        trace!(self.entity ; "{} -> partial sum {}", flit, partial_sum);
        self.state.commit(next);
        sum_tx.put(partial_sum)?.await?;
        data_tx.put(flit)?.await
    }
}

impl Transition for PrefixSumA {
    type State = ();
    type Input = Flit;
    type Output = Element;

    fn transition(&self, _state: (), input: &Flit) -> ((), Element) {
        let partial_sum = input
            .elements()
            .iter()
            .fold(0, |sum: Element, element| sum.wrapping_add(*element));
        ((), partial_sum)
    }
}

#[async_trait(?Send)]
impl Runnable for PrefixSumA {
    async fn run(&self) -> SimResult {
        let rx = take_option!(self.rx);
        let sum_tx = take_option!(self.sum_tx);
        let data_tx = take_option!(self.data_tx);
        let (sum_tx, data_tx) = (&sum_tx, &data_tx);
        drive_single_input(&self.clock, self.read_mode, rx, &self.bubbles, move |flit| {
            self.fire(sum_tx, data_tx, flit)
        })
        .await
    }
}

#[derive(EntityGet, EntityDisplay)]
pub struct PrefixSumB {
    pub entity: Rc<Entity>,
    clock: Clock,
    lanes: usize,
    read_mode: ReadMode,
    sum_so_far: ArchState<Element>,
    bubbles: Bubbles,
    sum_rx: RefCell<Option<InPort<Element>>>,
    data_rx: RefCell<Option<InPort<Flit>>>,
    tx: RefCell<Option<OutPort<Flit>>>,
}

impl PrefixSumB {
    pub fn new_and_register(
        engine: &Engine,
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        lanes: usize,
        depth: usize,
        read_mode: ReadMode,
    ) -> Result<Rc<Self>, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        if lanes == 0 {
            return sim_error!(format!("{entity}: unsupported flits with 0 lanes"));
        }
        let sum_rx = InPort::new(clock, &entity, "sum_rx", depth)?;
        let data_rx = InPort::new(clock, &entity, "data_rx", depth)?;
        let tx = OutPort::new(&entity, "tx");
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            lanes,
            read_mode,
            sum_so_far: ArchState::new(),
            bubbles: Bubbles::default(),
            sum_rx: RefCell::new(Some(sum_rx)),
            data_rx: RefCell::new(Some(data_rx)),
            tx: RefCell::new(Some(tx)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn port_sum_rx(&self) -> ChannelStateResult<Element> {
        port_rx!(self.sum_rx, state)
    }

    pub fn port_data_rx(&self) -> ChannelStateResult<Flit> {
        port_rx!(self.data_rx, state)
    }

    pub fn connect_port_tx(&self, port_state: ChannelStateResult<Flit>) -> SimResult {
        connect_tx!(self.tx, connect ; port_state)
    }

    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    #[must_use]
    pub fn sum_so_far(&self) -> Element {
        self.sum_so_far.current()
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.sum_so_far.transitions()
    }

    #[must_use]
    pub fn bubbles(&self) -> u64 {
        self.bubbles.count()
    }

    async fn fire(&self, tx: &OutPort<Flit>, flit: Flit, partial_sum: Element) -> SimResult {
        check_lanes(&self.entity, &flit, self.lanes)?;
        let (next, sums) = self.transition(self.sum_so_far.current(), &(flit, partial_sum));
        trace!(self.entity ; "{:?} -> total {}", sums, next);
        self.sum_so_far.commit(next);
        tx.put(Flit::new(&self.entity, sums))?.await
    }

    async fn run_blocking(
        &self,
        sum_rx: InPort<Element>,
        data_rx: InPort<Flit>,
        tx: OutPort<Flit>,
    ) -> SimResult {
        while let Some(flit) = data_rx.get()?.await {
            let Some(partial_sum) = sum_rx.get()?.await else {
                return sim_error!(format!("{}: no partial sum for {}", self.entity, flit));
            };
            self.fire(&tx, flit, partial_sum).await?;
            self.clock.wait_ticks(1).await;
        }
        if let TryGet::Value(partial_sum) = sum_rx.try_get()? {
            return sim_error!(format!(
                "{}: partial sum {} has no flit",
                self.entity, partial_sum
            ));
        }
        Ok(())
    }

    async fn run_polling(
        &self,
        sum_rx: InPort<Element>,
        data_rx: InPort<Flit>,
        tx: OutPort<Flit>,
    ) -> SimResult {
        let mut sums = InputGate::new(sum_rx);
        let mut data = InputGate::new(data_rx);
        loop {
            data.poll()?;
            sums.poll()?;

            if data.is_holding() && sums.is_holding() {
                if let (Some(flit), Some(partial_sum)) = (data.take(), sums.take()) {
                    self.fire(&tx, flit, partial_sum).await?;
                }
                self.clock.wait_ticks(1).await;
                continue;
            }

            match (data.is_closed(), sums.is_closed()) {
                (true, true) => return Ok(()),
                (true, false) if sums.is_holding() => {
                    return sim_error!(format!("{}: partial sum has no flit", self.entity));
                }
                (false, true) if data.is_holding() => {
                    return sim_error!(format!("{}: no partial sum for flit", self.entity));
                }
                _ => {}
            }

            self.bubbles.record();
            next_tick(&self.clock, data.is_quiet() && sums.is_quiet()).await;
        }
    }
}

impl Transition for PrefixSumB {
    type State = Element;
    type Input = (Flit, Element);
    type Output = Vec<Element>;

    fn transition(&self, state: Element, input: &(Flit, Element)) -> (Element, Vec<Element>) {
        let (flit, partial_sum) = input;
        let (_, sums) = running_sums(state, flit.elements());
        (state.wrapping_add(*partial_sum), sums)
    }
}

#[async_trait(?Send)]
impl Runnable for PrefixSumB {
    async fn run(&self) -> SimResult {
        let sum_rx = take_option!(self.sum_rx);
        let data_rx = take_option!(self.data_rx);
        let tx = take_option!(self.tx);
        match self.read_mode {
            ReadMode::Blocking => self.run_blocking(sum_rx, data_rx, tx).await,
            ReadMode::NonBlocking => self.run_polling(sum_rx, data_rx, tx).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_transitions_match_single_stage() {
        let engine = Engine::default();
        let clock = engine.default_clock();
        let top = engine.top();
        let a = PrefixSumA::new_and_register(&engine, &clock, top, "a", 3, 1, ReadMode::Blocking)
            .unwrap();
        let b = PrefixSumB::new_and_register(&engine, &clock, top, "b", 3, 1, ReadMode::Blocking)
            .unwrap();

        let flit = Flit::new(top, vec![1, 2, u64::MAX]);

        let ((), partial_sum) = a.transition((), &flit);
        assert_eq!(partial_sum, 2);

        let seed = 40;
        let (next, sums) = b.transition(seed, &(flit.clone(), partial_sum));
        assert_eq!((next, sums.clone()), running_sums(seed, flit.elements()));
        assert_eq!(sums, vec![41, 43, 42]);
    }
}
