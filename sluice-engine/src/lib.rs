// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Discrete-time simulation engine for streaming pipelines.
//!
//! The engine runs every unit of a pipeline (kernels, sources, sinks) as a
//! task on a single-threaded executor. Tasks only suspend on channel
//! operations or when waiting for a clock tick, so the simulation is fully
//! deterministic.
//!
//! # Simple Application
//!
//! ```rust
//! use sluice_engine::engine::Engine;
//!
//! let mut engine = Engine::default();
//! let clock = engine.default_clock();
//! engine.spawn(async move {
//!     clock.wait_ticks(10).await;
//!     Ok(())
//! });
//! engine.run().unwrap();
//! assert_eq!(engine.time_now_ns(), 10.0);
//! ```

pub mod channel;
pub mod engine;
pub mod events;
pub mod executor;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;

/// Run a simulation and panic with the error message if it fails.
#[macro_export]
macro_rules! run_simulation {
    ($engine:ident) => {
        if let Err(e) = $engine.run() {
            panic!("{e}");
        }
    };
}
