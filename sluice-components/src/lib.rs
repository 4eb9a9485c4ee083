// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Simulation components.
//!
//! Components shared by every pipeline: a [`Source`](source::Source) that
//! feeds a channel from a data generator and a [`Sink`](sink::Sink) that
//! drains one, plus the macros used to wire component ports together.

pub mod connect;
pub mod sink;
pub mod source;
pub mod types;
