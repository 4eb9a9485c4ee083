// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A clock counting whole ticks.
//!
//! Every unit of a pipeline performs at most one transition per tick, so the
//! tick is the only unit of time a model reasons about. The frequency is only
//! used to convert ticks into nanoseconds for reporting.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

pub struct TaskWaker {
    /// The Waker to use to make a task active again.
    pub waker: Waker,

    /// Background tasks that would otherwise run forever set `can_exit` so
    /// that they do not keep the simulation alive.
    pub can_exit: bool,
}

/// Shared state between futures using a Clock and the Clock itself.
pub struct ClockState {
    now: Cell<u64>,

    /// Tasks waiting for a tick, keyed by the tick they wait for.
    waiting: RefCell<BTreeMap<u64, Vec<TaskWaker>>>,
}

impl ClockState {
    fn schedule(&self, tick: u64, waker: &Waker, can_exit: bool) {
        self.waiting
            .borrow_mut()
            .entry(tick)
            .or_default()
            .push(TaskWaker {
                waker: waker.clone(),
                can_exit,
            });
    }

    fn advance_to(&self, tick: u64) {
        assert!(tick >= self.now.get(), "Time moving backwards");
        self.now.set(tick);
    }
}

#[derive(Clone)]
/// State representing a clock.
pub struct Clock {
    /// Frequency of the clock in MHz.
    freq_mhz: f64,

    shared_state: Rc<ClockState>,
}

impl Clock {
    /// Create a new [Clock] at the specified frequency.
    #[must_use]
    pub fn new(freq_mhz: f64) -> Self {
        Self {
            freq_mhz,
            shared_state: Rc::new(ClockState {
                now: Cell::new(0),
                waiting: RefCell::new(BTreeMap::new()),
            }),
        }
    }

    /// Returns the clock frequency in MHz.
    #[must_use]
    pub fn freq_mhz(&self) -> f64 {
        self.freq_mhz
    }

    /// Returns the current tick.
    #[must_use]
    pub fn tick_now(&self) -> u64 {
        self.shared_state.now.get()
    }

    /// Returns the current time in `ns`.
    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.to_ns(self.tick_now())
    }

    /// Returns the time in `ns` of the next event registered with this clock.
    #[must_use]
    pub fn time_of_next(&self) -> f64 {
        match self.shared_state.waiting.borrow().keys().next() {
            Some(tick) => self.to_ns(*tick),
            None => f64::MAX,
        }
    }

    /// Convert a tick count to a time in `ns` for this clock.
    #[must_use]
    pub fn to_ns(&self, tick: u64) -> f64 {
        tick as f64 / self.freq_mhz * 1000.0
    }

    /// Returns a [ClockDelay] future which must be `await`ed to delay the
    /// specified number of ticks.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks(&self, ticks: u64) -> ClockDelay {
        self.delay(ticks, false)
    }

    /// Returns a [ClockDelay] future which must be `await`ed to delay the
    /// specified number of ticks. However, if the remainder of the simulation
    /// completes then this future is allowed to never complete. This allows
    /// tasks that poll continuously for as long as the rest of the simulation
    /// continues to run.
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    pub fn wait_ticks_or_exit(&self, ticks: u64) -> ClockDelay {
        self.delay(ticks, true)
    }

    fn delay(&self, ticks: u64, can_exit: bool) -> ClockDelay {
        ClockDelay {
            shared_state: self.shared_state.clone(),
            until: self.tick_now() + ticks,
            scheduled: false,
            can_exit,
        }
    }

    /// Wake the task owning `waker` once the clock reaches `tick`.
    pub(crate) fn wake_at(&self, tick: u64, waker: &Waker) {
        self.shared_state.schedule(tick, waker, false);
    }

    /// Remove the earliest group of waiting tasks, moving the clock to the
    /// tick they were waiting for.
    pub(crate) fn pop_next(&self) -> Option<(u64, Vec<TaskWaker>)> {
        let (tick, wakers) = self.shared_state.waiting.borrow_mut().pop_first()?;
        self.shared_state.advance_to(tick);
        Some((tick, wakers))
    }

    /// True if every task waiting on this clock is a background task.
    pub(crate) fn can_exit(&self) -> bool {
        self.shared_state
            .waiting
            .borrow()
            .values()
            .flatten()
            .all(|task_waker| task_waker.can_exit)
    }
}

/// The default clock is 1GHz so ticks are 1ns.
impl Default for Clock {
    fn default() -> Self {
        Self::new(1000.0)
    }
}

/// Future returned by the clock to manage advancing time using async functions.
pub struct ClockDelay {
    shared_state: Rc<ClockState>,
    until: u64,
    scheduled: bool,
    can_exit: bool,
}

impl Future for ClockDelay {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared_state.now.get() >= self.until {
            return Poll::Ready(());
        }
        if !self.scheduled {
            self.shared_state
                .schedule(self.until, cx.waker(), self.can_exit);
            self.scheduled = true;
        }
        Poll::Pending
    }
}
