// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A signal that fires at most once, e.g. a sink having seen its last value.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::sim_error;
use crate::traits::{BoxFuture, Event};
use crate::types::SimResult;

#[derive(Default)]
struct Signal {
    fired: Cell<bool>,
    waiting: RefCell<Vec<Waker>>,
}

/// Clones share the same signal.
#[derive(Clone, Default)]
pub struct Once {
    signal: Rc<Signal>,
}

impl Once {
    /// Fire the event, waking every listener. Firing twice is an error.
    pub fn notify(&self) -> SimResult {
        if self.signal.fired.replace(true) {
            return sim_error!("once event already triggered");
        }
        for waker in self.signal.waiting.take() {
            waker.wake();
        }
        Ok(())
    }

    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.signal.fired.get()
    }
}

impl Event<()> for Once {
    fn listen(&self) -> BoxFuture<'static, ()> {
        Box::pin(Fired {
            signal: self.signal.clone(),
        })
    }
}

struct Fired {
    signal: Rc<Signal>,
}

impl Future for Fired {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.signal.fired.get() {
            return Poll::Ready(());
        }
        self.signal.waiting.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}
