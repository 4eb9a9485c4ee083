// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Single-threaded executor.
//!
//! Tasks are polled in batches. Waking a task queues it for the next batch,
//! and time only advances once a batch leaves nothing runnable, so every
//! transition that can happen at a tick happens before the tick moves on.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::Acquire;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use sluice_track::entity::Entity;
use sluice_track::trace;

use crate::time::clock::Clock;
use crate::time::simtime::SimTime;
use crate::types::SimResult;

static VTABLE: RawWakerVTable =
    RawWakerVTable::new(clone_raw_waker, wake_task, wake_task_by_ref, drop_raw_waker);

fn waker_for_task(task: Rc<Task>) -> Waker {
    let ptr = Rc::into_raw(task) as *const ();
    unsafe { Waker::from_raw(RawWaker::new(ptr, &VTABLE)) }
}

unsafe fn clone_raw_waker(data: *const ()) -> RawWaker {
    unsafe {
        // Tasks are always wrapped in an Rc so that they can be shared
        // read-only.
        Rc::increment_strong_count(data as *const Task);
    }
    RawWaker::new(data, &VTABLE)
}

unsafe fn wake_task(data: *const ()) {
    unsafe {
        let rc_task = Rc::from_raw(data as *const Task);
        rc_task.schedule();
    }
}

unsafe fn wake_task_by_ref(data: *const ()) {
    unsafe {
        let rc_task = Rc::from_raw(data as *const Task);
        rc_task.clone().schedule();
        // The waker still owns its reference.
        let _ = Rc::into_raw(rc_task);
    }
}

unsafe fn drop_raw_waker(data: *const ()) {
    unsafe {
        drop(Rc::from_raw(data as *const Task));
    }
}

struct Task {
    future: RefCell<Pin<Box<dyn Future<Output = SimResult>>>>,
    complete: Cell<bool>,
    executor_state: Weak<ExecutorState>,
}

impl Task {
    fn new(
        future: impl Future<Output = SimResult> + 'static,
        executor_state: Weak<ExecutorState>,
    ) -> Task {
        Task {
            future: RefCell::new(Box::pin(future)),
            complete: Cell::new(false),
            executor_state,
        }
    }

    fn poll(&self, context: &mut Context) -> Poll<SimResult> {
        self.future.borrow_mut().as_mut().poll(context)
    }

    fn schedule(self: Rc<Self>) {
        // Wakers can outlive the executor.
        if let Some(state) = self.executor_state.upgrade() {
            state.new_tasks.borrow_mut().push(self);
        }
    }
}

struct ExecutorState {
    task_queue: RefCell<Vec<Rc<Task>>>,
    new_tasks: RefCell<Vec<Rc<Task>>>,
    time: RefCell<SimTime>,

    /// Every spawned task that has not yet completed. A parked task may not
    /// have handed its waker to anyone, so this is what keeps it alive.
    live_tasks: RefCell<Vec<Rc<Task>>>,
}

impl ExecutorState {
    fn new(top: &Rc<Entity>) -> Self {
        Self {
            task_queue: RefCell::new(Vec::new()),
            new_tasks: RefCell::new(Vec::new()),
            time: RefCell::new(SimTime::new(top)),
            live_tasks: RefCell::new(Vec::new()),
        }
    }

    fn spawn(self: &Rc<Self>, future: impl Future<Output = SimResult> + 'static) {
        let task = Rc::new(Task::new(future, Rc::downgrade(self)));
        self.live_tasks.borrow_mut().push(task.clone());
        self.new_tasks.borrow_mut().push(task);
    }

    fn retire(&self, task: &Rc<Task>) {
        task.complete.set(true);
        self.live_tasks.borrow_mut().retain(|live| !Rc::ptr_eq(live, task));
    }
}

/// Single-threaded executor
///
/// This is a thin-wrapper (using [`Rc`]) around the real executor, so that this
/// struct can be cloned and passed around.
#[derive(Clone)]
pub struct Executor {
    pub entity: Rc<Entity>,
    state: Rc<ExecutorState>,
}

impl Executor {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }

    /// Run until no task can make progress or `finished` is set.
    pub fn run(&self, finished: &Rc<AtomicBool>) -> SimResult {
        loop {
            self.step(finished)?;
            if finished.load(Acquire) {
                break;
            }

            if self.state.new_tasks.borrow().is_empty() {
                let wakers = {
                    let mut time = self.state.time.borrow_mut();
                    if time.can_exit() {
                        break;
                    }
                    match time.advance_time() {
                        Some(wakers) => wakers,
                        None => break,
                    }
                };
                for task_waker in wakers {
                    task_waker.waker.wake();
                }
            }
        }
        trace!(self.entity ; "stopped with {} pending tasks", self.num_pending_tasks());
        Ok(())
    }

    fn step(&self, finished: &Rc<AtomicBool>) -> SimResult {
        // Append new tasks created since the last step into the task queue
        let mut task_queue = self.state.task_queue.borrow_mut();
        task_queue.append(&mut self.state.new_tasks.borrow_mut());

        for task in task_queue.drain(..) {
            if finished.load(Acquire) {
                break;
            }
            if task.complete.get() {
                continue;
            }

            let waker = waker_for_task(task.clone());
            let mut context = Context::from_waker(&waker);

            match task.poll(&mut context) {
                Poll::Ready(result) => {
                    self.state.retire(&task);
                    result?;
                }
                Poll::Pending => {
                    // Task will have parked itself waiting somewhere
                }
            }
        }
        Ok(())
    }

    pub fn get_clock(&self, freq_mhz: f64) -> Clock {
        self.state.time.borrow_mut().get_clock(freq_mhz)
    }

    pub fn time_now_ns(&self) -> f64 {
        self.state.time.borrow().time_now_ns()
    }

    /// Number of tasks that were spawned but never completed.
    pub fn num_pending_tasks(&self) -> usize {
        self.state.live_tasks.borrow().len()
    }
}

/// `Spawner` spawns new futures into the executor.
#[derive(Clone)]
pub struct Spawner {
    state: Rc<ExecutorState>,
}

impl Spawner {
    pub fn spawn(&self, future: impl Future<Output = SimResult> + 'static) {
        self.state.spawn(future);
    }
}

pub fn new_executor_and_spawner(top: &Rc<Entity>) -> (Executor, Spawner) {
    let state = Rc::new(ExecutorState::new(top));
    let entity = Rc::new(Entity::new(top, "executor"));
    (
        Executor {
            entity,
            state: state.clone(),
        },
        Spawner { state },
    )
}
