// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Building blocks shared by the kernels.
//!
//! A kernel is a perpetual unit that, on each tick, reads its inputs, applies
//! a pure [`Transition`] to its architectural state and writes its outputs.
//! Only the value committed to [`ArchState`] survives from one tick to the
//! next; everything else a transition computes is transient.
//!
//! Inputs are either read with blocking reads or, in
//! [`ReadMode::NonBlocking`], polled through an [`InputGate`] so that a
//! kernel never stalls on an empty channel and instead records a bubble.

use std::cell::Cell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sluice_engine::channel::{InPort, TryGet};
use sluice_engine::sim_error;
use sluice_engine::time::clock::Clock;
use sluice_engine::traits::SimObject;
use sluice_engine::types::SimResult;
use sluice_track::entity::Entity;

use crate::flit::Flit;

/// A pure step function from architectural state and inputs to the next
/// state and the outputs of the tick.
pub trait Transition {
    type State: Copy + Default + fmt::Debug;
    type Input;
    type Output;

    fn transition(&self, state: Self::State, input: &Self::Input) -> (Self::State, Self::Output);
}

/// Architectural state owned by exactly one kernel.
pub struct ArchState<S>
where
    S: Copy + Default,
{
    value: Cell<S>,
    transitions: Cell<u64>,
}

impl<S> ArchState<S>
where
    S: Copy + Default,
{
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: Cell::new(S::default()),
            transitions: Cell::new(0),
        }
    }

    /// State as of the last tick boundary.
    #[must_use]
    pub fn current(&self) -> S {
        self.value.get()
    }

    /// Replace the state at the end of a transition.
    pub fn commit(&self, next: S) {
        self.value.set(next);
        self.transitions.set(self.transitions.get() + 1);
    }

    #[must_use]
    pub fn transitions(&self) -> u64 {
        self.transitions.get()
    }
}

impl<S> Default for ArchState<S>
where
    S: Copy + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

/// How a kernel reads its input channels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReadMode {
    /// Suspend on each read until a value is available.
    #[default]
    Blocking,

    /// Poll each input once per tick and idle when nothing has arrived.
    NonBlocking,
}

/// Non-blocking access to one input channel.
///
/// The gate only polls its channel while `expecting_input` is set. Once a
/// value arrives it is held, and the flag cleared, until the kernel takes it.
pub struct InputGate<T>
where
    T: SimObject,
{
    port: InPort<T>,
    expecting_input: bool,
    held: Option<T>,
    closed: bool,
}

impl<T> InputGate<T>
where
    T: SimObject,
{
    #[must_use]
    pub fn new(port: InPort<T>) -> Self {
        Self {
            port,
            expecting_input: true,
            held: None,
            closed: false,
        }
    }

    /// Try to read once if a value is expected.
    pub fn poll(&mut self) -> SimResult {
        if !self.expecting_input || self.closed {
            return Ok(());
        }
        match self.port.try_get()? {
            TryGet::Value(value) => {
                self.held = Some(value);
                self.expecting_input = false;
            }
            TryGet::Absent => {}
            TryGet::Closed => self.closed = true,
        }
        Ok(())
    }

    /// Consume the held value and start expecting the next one.
    pub fn take(&mut self) -> Option<T> {
        let value = self.held.take()?;
        self.expecting_input = true;
        Some(value)
    }

    #[must_use]
    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    #[must_use]
    pub fn is_expecting(&self) -> bool {
        self.expecting_input
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// True when this gate cannot receive anything unless another unit makes
    /// progress first.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.closed || self.held.is_some() || self.port.is_empty()
    }
}

/// Fail if `flit` does not have the lane count the kernel was built for.
pub fn check_lanes(entity: &Rc<Entity>, flit: &Flit, lanes: usize) -> SimResult {
    if flit.lanes() != lanes {
        return sim_error!(format!(
            "{entity}: received {flit} with {} lanes, expected {lanes}",
            flit.lanes()
        ));
    }
    Ok(())
}

/// Counts the ticks on which a kernel could not fire.
#[derive(Default)]
pub struct Bubbles(Cell<u64>);

impl Bubbles {
    pub fn record(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.0.get()
    }
}

/// Wait until the next tick. A kernel with nothing in flight waits in the
/// background so that it does not keep a stalled simulation alive.
pub async fn next_tick(clock: &Clock, quiet: bool) {
    if quiet {
        clock.wait_ticks_or_exit(1).await;
    } else {
        clock.wait_ticks(1).await;
    }
}

/// Drive a kernel with one input until that input closes, calling `fire`
/// with each value read and allowing one value per tick.
pub async fn drive_single_input<T, F, Fut>(
    clock: &Clock,
    read_mode: ReadMode,
    rx: InPort<T>,
    bubbles: &Bubbles,
    mut fire: F,
) -> SimResult
where
    T: SimObject,
    F: FnMut(T) -> Fut,
    Fut: Future<Output = SimResult>,
{
    match read_mode {
        ReadMode::Blocking => {
            while let Some(value) = rx.get()?.await {
                fire(value).await?;
                clock.wait_ticks(1).await;
            }
        }
        ReadMode::NonBlocking => {
            let mut input = InputGate::new(rx);
            loop {
                input.poll()?;
                if let Some(value) = input.take() {
                    fire(value).await?;
                    clock.wait_ticks(1).await;
                } else if input.is_closed() {
                    break;
                } else {
                    bubbles.record();
                    next_tick(clock, input.is_quiet()).await;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sluice_engine::channel::OutPort;
    use sluice_engine::engine::Engine;
    use sluice_engine::run_simulation;

    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Count(u64);

    #[test]
    fn arch_state_commits() {
        let state: ArchState<Count> = ArchState::new();
        assert_eq!(state.current(), Count(0));
        state.commit(Count(3));
        state.commit(Count(5));
        assert_eq!(state.current(), Count(5));
        assert_eq!(state.transitions(), 2);
    }

    #[test]
    fn gate_holds_until_taken() {
        let mut engine = Engine::default();
        let clock = engine.default_clock();
        let mut tx = OutPort::new(engine.top(), "tx");
        let rx = InPort::new(&clock, engine.top(), "rx", 2).unwrap();
        tx.connect(rx.state()).unwrap();

        {
            let clock = clock.clone();
            engine.spawn(async move {
                tx.put(1_u64)?.await?;
                tx.put(2_u64)?.await?;
                clock.wait_ticks(1).await;
                Ok(())
            });
        }
        engine.spawn(async move {
            let mut gate = InputGate::new(rx);
            gate.poll()?;
            assert!(!gate.is_holding());
            assert!(!gate.is_quiet());

            clock.wait_ticks(1).await;
            gate.poll()?;
            assert!(gate.is_holding());
            assert!(!gate.is_expecting());

            // A held value stops the gate reading further.
            gate.poll()?;
            assert_eq!(gate.take(), Some(1));
            assert_eq!(gate.take(), None);

            gate.poll()?;
            assert_eq!(gate.take(), Some(2));

            clock.wait_ticks(1).await;
            gate.poll()?;
            assert!(gate.is_closed());
            assert!(gate.is_quiet());
            Ok(())
        });

        run_simulation!(engine);
    }
}
