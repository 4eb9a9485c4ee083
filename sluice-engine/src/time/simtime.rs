// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! The overall owner of time within a simulation.

use std::rc::Rc;

use sluice_track::entity::Entity;
use sluice_track::set_time;

use super::clock::{Clock, TaskWaker};

/// Contains all Clocks and the current simulation time in ns.
pub struct SimTime {
    pub entity: Rc<Entity>,

    current_ns: f64,

    /// Clocks are created on demand, one per frequency.
    clocks: Vec<Clock>,
}

impl SimTime {
    #[must_use]
    pub fn new(parent: &Rc<Entity>) -> Self {
        Self {
            entity: Rc::new(Entity::new(parent, "time")),
            current_ns: 0.0,
            clocks: Vec::new(),
        }
    }

    pub fn get_clock(&mut self, freq_mhz: f64) -> Clock {
        if let Some(clock) = self.clocks.iter().find(|c| c.freq_mhz() == freq_mhz) {
            return clock.clone();
        }
        let clock = Clock::new(freq_mhz);
        self.clocks.push(clock.clone());
        clock
    }

    /// Choose the clock with the next event, move it to that tick and return
    /// the tasks to wake.
    pub fn advance_time(&mut self) -> Option<Vec<TaskWaker>> {
        let next_clock = self
            .clocks
            .iter()
            .min_by(|a, b| a.time_of_next().total_cmp(&b.time_of_next()))?;
        let (tick, wakers) = next_clock.pop_next()?;

        let next_ns = next_clock.to_ns(tick);
        if self.current_ns != next_ns {
            set_time!(self.entity ; next_ns);
            self.current_ns = next_ns;
        }
        Some(wakers)
    }

    #[must_use]
    pub fn time_now_ns(&self) -> f64 {
        self.current_ns
    }

    /// The simulation can exit if all scheduled tasks can exit.
    #[must_use]
    pub fn can_exit(&self) -> bool {
        self.clocks.iter().all(Clock::can_exit)
    }
}
