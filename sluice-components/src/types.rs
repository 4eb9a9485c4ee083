// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

/// The iterator a [`Source`](crate::source::Source) draws its values from.
pub type DataGenerator<T> = Box<dyn Iterator<Item = T>>;
