// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Stream a sequence through a prefix-sum pipeline.
//!
//! The input is the sequence `0, 1, 2, ...` of the requested length. The
//! chosen pipeline computes its running sums, which are then checked against
//! a sequential reference.
//!
//! Configuration is layered, each layer overriding the one before:
//!  1. built-in defaults,
//!  2. an optional TOML file given with `--config-file`,
//!  3. environment variables prefixed with `SLUICE_` (e.g. `SLUICE_LANES=4`),
//!  4. command-line flags.

pub mod config;
