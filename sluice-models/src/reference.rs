// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The sequential prefix sum that every pipeline must reproduce.

use crate::errors::PipelineError;
use crate::flit::Element;

/// `output[i]` is the wrapping sum of `input[0..=i]`.
#[must_use]
pub fn prefix_sum(input: &[Element]) -> Vec<Element> {
    input
        .iter()
        .scan(0, |total: &mut Element, element| {
            *total = total.wrapping_add(*element);
            Some(*total)
        })
        .collect()
}

/// Compare `actual` against `expected`, reporting the first difference.
pub fn verify(expected: &[Element], actual: &[Element]) -> Result<(), PipelineError> {
    if let Some((index, (e, a))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (e, a))| e != a)
    {
        return Err(PipelineError::DataMismatch {
            index,
            expected: *e,
            actual: *a,
        });
    }
    if expected.len() != actual.len() {
        return Err(PipelineError::OutputLength {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}
