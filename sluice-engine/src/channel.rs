// Copyright (c) 2024 Graphcore Ltd. All rights reserved.

//! Bounded single-producer/single-consumer channels.
//!
//! A channel is made of two ends:
//!  - the [`InPort`] owned by the consumer, which holds the FIFO storage and
//!    is given its depth at construction, and
//!  - the [`OutPort`] owned by the producer, which is connected exactly once
//!    to the state of an [`InPort`].
//!
//! Each end refuses a second connection, so a channel can never have more
//! than one producer or consumer.
//!
//! A value written at tick `t` becomes visible to the consumer at tick
//! `t + 1`: every channel behaves as a pipeline register. Writes block while
//! the channel holds `depth` values and reads block while it is empty. Once
//! the producer is dropped and the FIFO drained, reads report that the
//! channel is closed so consumers can shut down cleanly.
//!
//! # Example
//!
//! ```rust
//! use std::rc::Rc;
//!
//! use sluice_engine::channel::{InPort, OutPort};
//! use sluice_engine::engine::Engine;
//!
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! let mut tx = OutPort::new(engine.top(), "tx");
//! let rx = InPort::new(&clock, engine.top(), "rx", 2).unwrap();
//! tx.connect(rx.state()).unwrap();
//!
//! engine.spawn(async move {
//!     for i in 0..4_u64 {
//!         tx.put(i)?.await?;
//!     }
//!     Ok(())
//! });
//! let received = Rc::new(std::cell::RefCell::new(Vec::new()));
//! {
//!     let received = received.clone();
//!     engine.spawn(async move {
//!         while let Some(value) = rx.get()?.await {
//!             received.borrow_mut().push(value);
//!         }
//!         Ok(())
//!     });
//! }
//! engine.run().unwrap();
//! assert_eq!(*received.borrow(), vec![0, 1, 2, 3]);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::Future;
use futures::future::FusedFuture;
use sluice_track::entity::Entity;
use sluice_track::{connect, enter, exit};

use crate::sim_error;
use crate::time::clock::Clock;
use crate::traits::SimObject;
use crate::types::{SimError, SimResult};

pub type ChannelStateResult<T> = Result<Rc<ChannelState<T>>, SimError>;
pub type ChannelGetResult<T> = Result<ChannelGet<T>, SimError>;
pub type ChannelPutResult<T> = Result<ChannelPut<T>, SimError>;

/// Number of ticks between a write and the value becoming readable.
pub const CHANNEL_LATENCY_TICKS: u64 = 1;

/// The result of a non-blocking read.
#[derive(Debug, PartialEq)]
pub enum TryGet<T> {
    /// A value was removed from the channel.
    Value(T),

    /// Nothing is readable at this tick.
    Absent,

    /// The producer has gone and the channel is drained.
    Closed,
}

pub struct ChannelState<T>
where
    T: SimObject,
{
    pub in_port_entity: Rc<Entity>,
    clock: Clock,
    depth: usize,

    /// Values in write order with the tick at which each becomes readable.
    buffer: RefCell<VecDeque<(T, u64)>>,

    waiting_get: RefCell<Option<Waker>>,
    waiting_put: RefCell<Option<Waker>>,
    producer_closed: Cell<bool>,
    consumer_closed: Cell<bool>,
}

impl<T> ChannelState<T>
where
    T: SimObject,
{
    fn new(in_port_entity: Rc<Entity>, clock: &Clock, depth: usize) -> Self {
        Self {
            in_port_entity,
            clock: clock.clone(),
            depth,
            buffer: RefCell::new(VecDeque::with_capacity(depth)),
            waiting_get: RefCell::new(None),
            waiting_put: RefCell::new(None),
            producer_closed: Cell::new(false),
            consumer_closed: Cell::new(false),
        }
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Tick at which the oldest value becomes readable.
    fn front_ready_tick(&self) -> Option<u64> {
        self.buffer.borrow().front().map(|(_, ready)| *ready)
    }

    fn push(&self, value: T) {
        enter!(self.in_port_entity ; value.id());
        let ready = self.clock.tick_now() + CHANNEL_LATENCY_TICKS;
        self.buffer.borrow_mut().push_back((value, ready));
        if let Some(waker) = self.waiting_get.borrow_mut().take() {
            waker.wake();
        }
    }

    /// Remove the oldest value, which the caller has checked is readable.
    fn pop_ready(&self) -> Option<T> {
        let (value, _) = self.buffer.borrow_mut().pop_front()?;
        exit!(self.in_port_entity ; value.id());
        if let Some(waker) = self.waiting_put.borrow_mut().take() {
            waker.wake();
        }
        Some(value)
    }

    fn close_producer(&self) {
        self.producer_closed.set(true);
        if let Some(waker) = self.waiting_get.borrow_mut().take() {
            waker.wake();
        }
    }

    fn close_consumer(&self) {
        self.consumer_closed.set(true);
        if let Some(waker) = self.waiting_put.borrow_mut().take() {
            waker.wake();
        }
    }
}

/// The consumer end of a channel.
pub struct InPort<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    state: Rc<ChannelState<T>>,
    connected: RefCell<bool>,
}

impl<T> fmt::Display for InPort<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.entity, f)
    }
}

impl<T> InPort<T>
where
    T: SimObject,
{
    /// Create the consumer end of a channel able to hold `depth` values.
    pub fn new(
        clock: &Clock,
        parent: &Rc<Entity>,
        name: &str,
        depth: usize,
    ) -> Result<Self, SimError> {
        let entity = Rc::new(Entity::new(parent, name));
        if depth == 0 {
            return sim_error!(format!("{entity}: unsupported channel with 0 depth"));
        }
        Ok(Self {
            entity: entity.clone(),
            state: Rc::new(ChannelState::new(entity, clock, depth)),
            connected: RefCell::new(false),
        })
    }

    /// Hand out the shared state so that one [`OutPort`] can connect to it.
    pub fn state(&self) -> ChannelStateResult<T> {
        if *self.connected.borrow() {
            return sim_error!(format!("{self} already connected"));
        }

        *self.connected.borrow_mut() = true;
        Ok(self.state.clone())
    }

    fn check_connected(&self) -> SimResult {
        if !*self.connected.borrow() {
            return sim_error!(format!("{self} not connected"));
        }
        Ok(())
    }

    /// Read the next value, blocking until one is readable. Resolves to
    /// `None` once the producer is gone and the channel is drained.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn get(&self) -> ChannelGetResult<T> {
        self.check_connected()?;
        Ok(ChannelGet {
            state: self.state.clone(),
            scheduled_for: None,
            done: false,
        })
    }

    /// Read the next value without blocking.
    pub fn try_get(&self) -> Result<TryGet<T>, SimError> {
        self.check_connected()?;
        let now = self.state.clock.tick_now();
        let result = match self.state.front_ready_tick() {
            Some(ready) if ready <= now => match self.state.pop_ready() {
                Some(value) => TryGet::Value(value),
                None => TryGet::Absent,
            },
            Some(_) => TryGet::Absent,
            None if self.state.producer_closed.get() => TryGet::Closed,
            None => TryGet::Absent,
        };
        Ok(result)
    }

    /// Number of values held, including those not yet readable.
    #[must_use]
    pub fn occupancy(&self) -> usize {
        self.state.buffer.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.state.depth
    }
}

impl<T> Drop for InPort<T>
where
    T: SimObject,
{
    fn drop(&mut self) {
        self.state.close_consumer();
    }
}

/// The producer end of a channel.
pub struct OutPort<T>
where
    T: SimObject,
{
    pub entity: Rc<Entity>,
    state: Option<Rc<ChannelState<T>>>,
}

impl<T> fmt::Display for OutPort<T>
where
    T: SimObject,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.entity, f)
    }
}

impl<T> OutPort<T>
where
    T: SimObject,
{
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, name)),
            state: None,
        }
    }

    pub fn connect(&mut self, channel_state: ChannelStateResult<T>) -> SimResult {
        let channel_state = channel_state?;
        if self.state.is_some() {
            return sim_error!(format!("{self} already connected"));
        }

        connect!(self.entity ; channel_state.in_port_entity);
        self.state = Some(channel_state);
        Ok(())
    }

    /// Write a value, blocking while the channel is full.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn put(&self, value: T) -> ChannelPutResult<T> {
        let state = match self.state.as_ref() {
            Some(s) => s.clone(),
            None => return sim_error!(format!("{self} not connected")),
        };
        Ok(ChannelPut {
            entity: self.entity.clone(),
            state,
            value: RefCell::new(Some(value)),
            done: RefCell::new(false),
        })
    }

    /// Depth of the connected channel.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.state.as_ref().map(|s| s.depth)
    }
}

impl<T> Drop for OutPort<T>
where
    T: SimObject,
{
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            state.close_producer();
        }
    }
}

pub struct ChannelGet<T>
where
    T: SimObject,
{
    state: Rc<ChannelState<T>>,

    /// Tick at which this future has asked the clock to wake it.
    scheduled_for: Option<u64>,
    done: bool,
}

impl<T> Future for ChannelGet<T>
where
    T: SimObject,
{
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let now = self.state.clock.tick_now();
        match self.state.front_ready_tick() {
            Some(ready) if ready <= now => {
                self.done = true;
                Poll::Ready(self.state.pop_ready())
            }
            Some(ready) => {
                // The value is in flight; come back when it lands.
                if self.scheduled_for != Some(ready) {
                    self.state.clock.wake_at(ready, cx.waker());
                    self.scheduled_for = Some(ready);
                }
                Poll::Pending
            }
            None if self.state.producer_closed.get() => {
                self.done = true;
                Poll::Ready(None)
            }
            None => {
                *self.state.waiting_get.borrow_mut() = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<T> FusedFuture for ChannelGet<T>
where
    T: SimObject,
{
    fn is_terminated(&self) -> bool {
        self.done
    }
}

pub struct ChannelPut<T>
where
    T: SimObject,
{
    entity: Rc<Entity>,
    state: Rc<ChannelState<T>>,
    value: RefCell<Option<T>>,
    done: RefCell<bool>,
}

impl<T> Future for ChannelPut<T>
where
    T: SimObject,
{
    type Output = SimResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if *self.done.borrow() {
            return Poll::Ready(Ok(()));
        }
        if self.state.consumer_closed.get() {
            *self.done.borrow_mut() = true;
            return Poll::Ready(sim_error!(format!(
                "{}: consumer {} has closed",
                self.entity, self.state.in_port_entity
            )));
        }
        if self.state.buffer.borrow().len() < self.state.depth {
            if let Some(value) = self.value.borrow_mut().take() {
                self.state.push(value);
            }
            *self.done.borrow_mut() = true;
            Poll::Ready(Ok(()))
        } else {
            *self.state.waiting_put.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

impl<T> FusedFuture for ChannelPut<T>
where
    T: SimObject,
{
    fn is_terminated(&self) -> bool {
        *self.done.borrow()
    }
}
