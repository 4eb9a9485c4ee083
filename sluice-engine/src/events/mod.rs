// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Events that tasks can wait on.

pub mod once;
