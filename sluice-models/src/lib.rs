// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Streaming prefix-sum models.
//!
//! A stream of [elements](flit::Element) is packed into fixed-width
//! [flits](flit::Flit) and pushed through a pipeline of kernels connected by
//! bounded channels. Two pipelines are provided:
//!
//!  - a single-stage pipeline built around [`PrefixSum`](prefix_sum::PrefixSum),
//!  - a two-stage pipeline where [`PrefixSumA`](prefix_sum_split::PrefixSumA)
//!    reduces each flit to a partial sum and
//!    [`PrefixSumB`](prefix_sum_split::PrefixSumB) folds the partial sums into
//!    the running total.
//!
//! Both produce the same output as the sequential
//! [reference](reference::prefix_sum); the two-stage version takes one tick
//! longer.
//!
//! # Example
//!
//! ```rust
//! use sluice_models::pipeline::{
//!     ExecutionContext, PipelineConfig, PipelineVariant, run_and_verify,
//! };
//!
//! let config = PipelineConfig {
//!     lanes: 4,
//!     variant: PipelineVariant::TwoStage,
//!     ..PipelineConfig::default()
//! };
//! let input: Vec<u64> = (1..=8).collect();
//! let summary = run_and_verify(&ExecutionContext::default(), &config, &input).unwrap();
//! assert_eq!(summary.outputs, vec![1, 3, 6, 10, 15, 21, 28, 36]);
//! ```

pub mod errors;
pub mod flit;
pub mod kernel;
pub mod pipeline;
pub mod prefix_sum;
pub mod prefix_sum_split;
pub mod reference;
