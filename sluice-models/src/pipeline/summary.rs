// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use crate::flit::{ELEMENT_BYTES, Element};

/// The outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Output elements with any padding removed.
    pub outputs: Vec<Element>,

    /// Tick on which the sink received its last flit.
    pub ticks: u64,

    /// Flits that went through the pipeline.
    pub flits: usize,

    /// Units still running when the simulation stopped.
    pub pending_units: usize,

    /// Ticks on which a non-blocking kernel could not fire, summed over all
    /// kernels.
    pub bubbles: u64,

    pub lanes: usize,
    pub clock_mhz: f64,
}

impl RunSummary {
    #[must_use]
    pub fn elapsed_ns(&self) -> f64 {
        self.ticks as f64 / self.clock_mhz * 1000.0
    }

    /// Bytes carried by the flits, padding included.
    #[must_use]
    pub fn bytes_streamed(&self) -> usize {
        self.flits * self.lanes * ELEMENT_BYTES
    }

    /// Streaming bandwidth in GB/s.
    #[must_use]
    pub fn bandwidth_gbps(&self) -> f64 {
        let elapsed_ns = self.elapsed_ns();
        if elapsed_ns == 0.0 {
            return 0.0;
        }
        self.bytes_streamed() as f64 / elapsed_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandwidth() {
        let summary = RunSummary {
            outputs: Vec::new(),
            ticks: 101,
            flits: 100,
            pending_units: 0,
            bubbles: 0,
            lanes: 8,
            clock_mhz: 500.0,
        };
        assert_eq!(summary.elapsed_ns(), 202.0);
        assert_eq!(summary.bytes_streamed(), 6400);
        assert!((summary.bandwidth_gbps() - 6400.0 / 202.0).abs() < 1e-9);
    }

    #[test]
    fn empty_run_has_no_bandwidth() {
        let summary = RunSummary {
            outputs: Vec::new(),
            ticks: 0,
            flits: 0,
            pending_units: 0,
            bubbles: 0,
            lanes: 8,
            clock_mhz: 1000.0,
        };
        assert_eq!(summary.bandwidth_gbps(), 0.0);
    }
}
