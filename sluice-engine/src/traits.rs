// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the engine.

use std::fmt::{Debug, Display};
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sluice_track::Unique;

use crate::types::SimResult;

/// A super-trait that objects passed through channels have to implement
///
///  - Clone:   keeps copies possible where an application needs them.
///  - Debug:   in order to print "{:?}".
///  - Display: for log messages.
///  - Unique:  gives each object an id for _trace_ events.
///  - 'static: futures hold these objects so they cannot borrow.
pub trait SimObject: Clone + Debug + Display + Unique + 'static {}

impl SimObject for u64 {}

/// The `Event` trait defines an object that can be used as an Event
///
/// This is a trait that defines the `listen` function that returns a future
/// so that it can be used in `async` code.
pub trait Event<T> {
    #[must_use = "Futures do nothing unless you `.await` or otherwise use them"]
    fn listen(&self) -> BoxFuture<'static, T>;
}

/// A unit of concurrent execution registered with the
/// [`Engine`](crate::engine::Engine).
///
/// Every registered component has its `run` spawned as its own task when the
/// simulation starts.
#[async_trait(?Send)]
pub trait Runnable {
    async fn run(&self) -> SimResult {
        Ok(())
    }
}

pub type BoxFuture<'a, T> = Pin<std::boxed::Box<dyn Future<Output = T> + 'a>>;
