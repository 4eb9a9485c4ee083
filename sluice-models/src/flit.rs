// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Flits and the adapters between element streams and flit streams.
//!
//! A [`Flit`] carries a fixed number of lanes, one [`Element`] per lane, and
//! is the unit moved through a channel on each tick. The [`FlitPacker`]
//! turns an element stream into flits on the way in and [`unpack`] recovers
//! the elements on the way out.

use std::fmt;
use std::rc::Rc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sluice_engine::traits::SimObject;
use sluice_track::entity::Entity;
use sluice_track::{Id, Unique, create_id};

use crate::errors::PipelineError;

/// The payload carried in each lane.
pub type Element = u64;

/// Bytes occupied by one [`Element`].
pub const ELEMENT_BYTES: usize = std::mem::size_of::<Element>();

/// Default lane count, giving 64-byte flits.
pub const DEFAULT_LANES: usize = 8;

/// What to do with a final group of fewer than `lanes` elements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Padding {
    /// Fill the missing lanes with zero. Zeros do not change a prefix sum
    /// and are dropped again by [`unpack`].
    #[default]
    ZeroPad,

    /// Refuse input whose length is not a multiple of the lane count.
    Reject,
}

#[derive(Clone, Debug)]
pub struct Flit {
    id: Id,
    elements: Vec<Element>,
}

impl Flit {
    #[must_use]
    pub fn new(created_by: &Rc<Entity>, elements: Vec<Element>) -> Self {
        Self {
            id: create_id!(created_by),
            elements,
        }
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[must_use]
    pub fn lanes(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn into_elements(self) -> Vec<Element> {
        self.elements
    }
}

/// Flits compare by payload only.
impl PartialEq for Flit {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

impl SimObject for Flit {}

impl fmt::Display for Flit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "flit {} {:?}", self.id, self.elements)
    }
}

impl Unique for Flit {
    fn id(&self) -> Id {
        self.id
    }
}

/// Number of flits needed to carry `num_elements` elements.
pub fn num_flits(
    num_elements: usize,
    lanes: usize,
    padding: Padding,
) -> Result<usize, PipelineError> {
    if lanes == 0 {
        return Err(PipelineError::Configuration(
            "flits need at least one lane".to_string(),
        ));
    }
    let remainder = num_elements % lanes;
    if remainder != 0 && padding == Padding::Reject {
        return Err(PipelineError::Configuration(format!(
            "{num_elements} elements do not fill {lanes}-lane flits ({remainder} left over)"
        )));
    }
    Ok(num_elements.div_ceil(lanes))
}

/// Packs an element stream into flits, one flit per call to `next`.
pub struct FlitPacker {
    created_by: Rc<Entity>,
    elements: std::vec::IntoIter<Element>,
    lanes: usize,
}

impl FlitPacker {
    pub fn new(
        created_by: &Rc<Entity>,
        elements: Vec<Element>,
        lanes: usize,
        padding: Padding,
    ) -> Result<Self, PipelineError> {
        num_flits(elements.len(), lanes, padding)?;
        Ok(Self {
            created_by: created_by.clone(),
            elements: elements.into_iter(),
            lanes,
        })
    }
}

impl Iterator for FlitPacker {
    type Item = Flit;

    fn next(&mut self) -> Option<Self::Item> {
        let mut lanes: Vec<Element> = self.elements.by_ref().take(self.lanes).collect();
        if lanes.is_empty() {
            return None;
        }
        lanes.resize(self.lanes, 0);
        Some(Flit::new(&self.created_by, lanes))
    }
}

/// Flatten `flits` back into the first `num_elements` elements, dropping any
/// padding.
pub fn unpack(
    flits: Vec<Flit>,
    num_elements: usize,
    lanes: usize,
) -> Result<Vec<Element>, PipelineError> {
    let mut elements = Vec::with_capacity(flits.len() * lanes);
    for flit in flits {
        if flit.lanes() != lanes {
            return Err(PipelineError::Configuration(format!(
                "{flit} has {} lanes, expected {lanes}",
                flit.lanes()
            )));
        }
        elements.extend(flit.into_elements());
    }
    if elements.len() < num_elements {
        return Err(PipelineError::OutputLength {
            expected: num_elements,
            actual: elements.len(),
        });
    }
    elements.truncate(num_elements);
    Ok(elements)
}
