// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Helper functions for testing _log_ and _trace_ output.

use std::cell::{Cell, RefCell};
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use std::rc::Rc;

use regex::Regex;

use crate::tracker::{EntityManager, TextTracker, dev_null_tracker};
use crate::{Id, Track, Tracker};

/// A tracker that keeps track events in memory.
pub struct TestTracker {
    events: RefCell<Vec<String>>,

    unique_id: Cell<u64>,
}

impl TestTracker {
    /// Create a new [`Tracker`](crate::Tracker) for the tests.
    #[must_use]
    pub fn new(initial_id: u64) -> Self {
        Self {
            events: RefCell::new(Vec::new()),
            unique_id: Cell::new(initial_id),
        }
    }

    fn add_event(&self, event: String) {
        println!("{event}");
        self.events.borrow_mut().push(event);
    }
}

impl Track for TestTracker {
    fn unique_id(&self) -> Id {
        let id = self.unique_id.get();
        self.unique_id.set(id + 1);
        Id(id)
    }

    fn is_entity_enabled(&self, _id: Id, _level: log::Level) -> bool {
        true
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {}

    fn enter(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} entered"));
    }

    fn exit(&self, id: Id, item: Id) {
        self.add_event(format!("{id}: {item} exited"));
    }

    fn create(&self, created_by: Id, id: Id, name: &str) {
        self.add_event(format!("{created_by}: created {id}, {name}"));
    }

    fn destroy(&self, destroyed_by: Id, id: Id) {
        self.add_event(format!("{destroyed_by}: destroyed {id}"));
    }

    fn connect(&self, connect_from: Id, connect_to: Id) {
        self.add_event(format!("{connect_from}: connect to {connect_to}"));
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(format!("{id}:{level}: {msg}"));
    }

    fn time(&self, set_by: Id, time_ns: f64) {
        self.add_event(format!("{set_by}: set time {time_ns:.1}ns"));
    }

    fn shutdown(&self) {}
}

/// Create a [`TestTracker`] and the same tracker as a [`Tracker`].
///
/// ```
/// let (test_tracker, tracker) = sluice_track::test_init!(10);
/// let _top = sluice_track::entity::toplevel(&tracker, "top");
/// sluice_track::test_helpers::check_and_clear(&test_tracker, &["0: created 10, top"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($start_id:expr) => {{
        let test_tracker = std::rc::Rc::new($crate::test_helpers::TestTracker::new($start_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Assert that the events recorded since the last call match the `expected`
/// regular expressions, then clear them.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut events = tracker.events.borrow_mut();

    assert_eq!(
        expected.len(),
        events.len(),
        "expected {expected:?}, seen {events:?}"
    );
    for (log_expect, actual) in expected.iter().zip(events.iter()) {
        let re = Regex::new(log_expect).unwrap();
        assert!(re.is_match(actual), "{log_expect:?} does not match {actual:?}");
    }

    events.clear();
}

/// Create a [`Tracker`] for a test file.
///
/// All events are written to `traces/<test file stem>.log` at `Trace` level
/// so a failing test leaves its full history behind. If the trace file cannot
/// be created the events are discarded.
#[must_use]
pub fn create_tracker(full_filepath: &str) -> Tracker {
    let stem = Path::new(full_filepath)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("test");

    if fs::create_dir_all("traces").is_err() {
        return dev_null_tracker();
    }
    match fs::File::create(format!("traces/{stem}.log")) {
        Ok(file) => Rc::new(TextTracker::new(
            EntityManager::new(log::Level::Trace),
            Box::new(BufWriter::new(file)),
        )),
        Err(_) => dev_null_tracker(),
    }
}
