// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The single-stage prefix-sum kernel.
//!
//! On each tick the kernel reads one flit and, walking the lanes in order,
//! adds each element to its running total and writes the total to the same
//! lane of the output flit. The running total is the only architectural
//! state; the output flit is transient.
//!
//! # Ports
//!
//! This component has the following ports:
//!  - One [input port](sluice_engine::channel::InPort): `rx`
//!  - One [output port](sluice_engine::channel::OutPort): `tx`
//!
//! # Example
//!
//! ```rust
//! # use sluice_components::sink::Sink;
//! # use sluice_components::source::Source;
//! # use sluice_components::connect_port;
//! # use sluice_engine::engine::Engine;
//! # use sluice_engine::run_simulation;
//! # use sluice_models::flit::{Flit, FlitPacker, Padding};
//! # use sluice_models::kernel::ReadMode;
//! # use sluice_models::prefix_sum::PrefixSum;
//! # use sluice_track::entity::GetEntity;
//! #
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! let top = engine.top();
//!
//! let source = Source::<Flit>::new_and_register(&engine, &clock, top, "source", None).unwrap();
//! let packer = FlitPacker::new(source.entity(), vec![1, 2, 3, 4], 2, Padding::Reject).unwrap();
//! source.set_generator(Some(Box::new(packer)));
//!
//! let kernel =
//!     PrefixSum::new_and_register(&engine, &clock, top, "prefix_sum", 2, 2, ReadMode::Blocking)
//!         .unwrap();
//! let sink = Sink::new_and_register(&engine, &clock, top, "sink", 2, Some(2)).unwrap();
//!
//! connect_port!(source, tx => kernel, rx).unwrap();
//! connect_port!(kernel, tx => sink, rx).unwrap();
//! run_simulation!(engine);
//!
//! let sums: Vec<Vec<u64>> = sink.take_sunk().into_iter().map(|f| f.into_elements()).collect();
//! assert_eq!(sums, vec![vec![1, 3], vec![6, 10]]);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use sluice_components::{connect_tx, port_rx, take_option};
use sluice_engine::channel::{ChannelStateResult, InPort, OutPort};
use sluice_engine::engine::Engine;
use sluice_engine::sim_error;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::Runnable;
use sluice_engine::types::{SimError, SimResult};
use sluice_model_builder::{EntityDisplay, EntityGet};
use sluice_track::entity::Entity;
use sluice_track::trace;

use crate::flit::{Element, Flit};
use crate::kernel::{ArchState, Bubbles, ReadMode, Transition, check_lanes, drive_single_input};

/// Running sums of `elements` starting from `seed`, together with the final
/// total.
#[must_use]
pub fn running_sums(seed: Element, elements: &[Element]) -> (Element, Vec<Element>) {
    let mut total = seed;
    let sums = elements
        .iter()
        .map(|element| {
            total = total.wrapping_add(*element);
            total
        })
        .collect();
    (total, sums)
}

#[derive(EntityGet, EntityDisplay)]
pub struct PrefixSum {
    pub entity: Rc<Entity>,
    clock: Clock,
    lanes: usize,
    read_mode: ReadMode,
    prefix_sum: ArchState<Element>,
    bubbles: Bubbles,
    rx: RefCell<Option<InPort<Flit>>>,
    tx: RefCell<Option<OutPort<Flit>>>,
}

impl PrefixSum {
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
        let tx = OutPort::new(&entity, "tx");
        let rc_self = Rc::new(Self {
            entity,
            clock: clock.clone(),
            lanes,
            read_mode,
            prefix_sum: ArchState::new(),
            bubbles: Bubbles::default(),
            rx: RefCell::new(Some(rx)),
            tx: RefCell::new(Some(tx)),
        });
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    pub fn connect_port_tx(&self, port_state: ChannelStateResult<Flit>) -> SimResult {
        connect_tx!(self.tx, connect ; port_state)
    }

    pub fn port_rx(&self) -> ChannelStateResult<Flit> {
        port_rx!(self.rx, state)
    }

    #[must_use]
    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Running total after the last completed transition.
    #[must_use]
    pub fn prefix_sum(&self) -> Element {
        self.prefix_sum.current()
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.prefix_sum.transitions()
    }

    #[must_use]
    pub fn bubbles(&self) -> u64 {
        self.bubbles.count()
    }

    async fn fire(&self, tx: &OutPort<Flit>, flit: Flit) -> SimResult {
        check_lanes(&self.entity, &flit, self.lanes)?;
        let (next, sums) = self.transition(self.prefix_sum.current(), &flit);
        trace!(self.entity ; "{} -> {:?}, total {}", flit, sums, next);
        self.prefix_sum.commit(next);
        tx.put(Flit::new(&self.entity, sums))?.await
    }
}

impl Transition for PrefixSum {
    type State = Element;
    type Input = Flit;
    type Output = Vec<Element>;

    fn transition(&self, state: Element, input: &Flit) -> (Element, Vec<Element>) {
        running_sums(state, input.elements())
    }
}

#[async_trait(?Send)]
impl Runnable for PrefixSum {
    async fn run(&self) -> SimResult {
        let rx = take_option!(self.rx);
        let tx = take_option!(self.tx);
        let tx = &tx;
        drive_single_input(&self.clock, self.read_mode, rx, &self.bubbles, move |flit| {
            self.fire(tx, flit)
        })
        .await
    }
}
