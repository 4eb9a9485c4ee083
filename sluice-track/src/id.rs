// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Unique identifiers

use std::fmt;

/// Identifier that is unique across the simulation.
///
/// Each _log_/_trace_ event is emitted against an [`Id`]. There are two
/// reserved values: [`NO_ID`](crate::NO_ID) and [`ROOT`](crate::ROOT).
#[derive(Copy, Clone, Default, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Objects that can be identified in _trace_ events.
pub trait Unique {
    /// Return the [`Id`] of this object.
    fn id(&self) -> Id;
}

impl Unique for Id {
    fn id(&self) -> Id {
        *self
    }
}

// Scalars are identified by their value.
impl Unique for u64 {
    fn id(&self) -> Id {
        Id(*self)
    }
}
