// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Errors reported while building, running or checking a pipeline.

use std::error::Error;
use std::fmt;

use sluice_engine::types::SimError;

use crate::flit::Element;

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The pipeline could not be built. Nothing has been run.
    Configuration(String),

    /// The sink did not collect every flit it expected.
    Deadlock {
        collected: usize,
        expected: usize,
        tick: u64,
        pending_units: usize,
        /// Tick budget, when the run was stopped by the watchdog.
        watchdog: Option<u64>,
    },

    /// The output differs from the reference at `index`.
    DataMismatch {
        index: usize,
        expected: Element,
        actual: Element,
    },

    OutputLength {
        expected: usize,
        actual: usize,
    },

    /// Error raised by a unit while the simulation was running.
    Sim(SimError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PipelineError::Configuration(msg) => write!(f, "configuration error: {msg}"),
            PipelineError::Deadlock {
                collected,
                expected,
                tick,
                pending_units,
                watchdog: Some(budget),
            } => write!(
                f,
                "deadlock: watchdog expired after {budget} ticks at tick {tick} with {collected} of {expected} flits collected ({pending_units} units blocked)"
            ),
            PipelineError::Deadlock {
                collected,
                expected,
                tick,
                pending_units,
                watchdog: None,
            } => write!(
                f,
                "deadlock: stalled at tick {tick} with {collected} of {expected} flits collected ({pending_units} units blocked)"
            ),
            PipelineError::DataMismatch {
                index,
                expected,
                actual,
            } => write!(
                f,
                "data mismatch at index {index}: expected {expected}, got {actual}"
            ),
            PipelineError::OutputLength { expected, actual } => write!(
                f,
                "output length mismatch: expected {expected} elements, got {actual}"
            ),
            PipelineError::Sim(e) => fmt::Display::fmt(e, f),
        }
    }
}

impl Error for PipelineError {}

impl From<SimError> for PipelineError {
    fn from(e: SimError) -> Self {
        PipelineError::Sim(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let e = PipelineError::Configuration("channel depth must be at least 1".to_string());
        assert_eq!(
            e.to_string(),
            "configuration error: channel depth must be at least 1"
        );

        let e = PipelineError::DataMismatch {
            index: 3,
            expected: 10,
            actual: 9,
        };
        assert_eq!(e.to_string(), "data mismatch at index 3: expected 10, got 9");

        let e: PipelineError = SimError("boom".to_string()).into();
        assert_eq!(e.to_string(), "Error: boom");
    }

    #[test]
    fn deadlock_names_the_watchdog() {
        let e = PipelineError::Deadlock {
            collected: 1,
            expected: 4,
            tick: 5,
            pending_units: 0,
            watchdog: Some(5),
        };
        assert!(e.to_string().contains("watchdog expired after 5 ticks"));
    }
}
