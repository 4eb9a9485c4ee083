// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::cell::Cell;

use crate::tracker::Track;
use crate::{Id, ROOT};

/// A tracker that discards every event but still hands out unique ids.
pub struct DevNullTracker {
    unique_id: Cell<u64>,
}

impl Default for DevNullTracker {
    fn default() -> Self {
        Self {
            unique_id: Cell::new(ROOT.0 + 1),
        }
    }
}

impl Track for DevNullTracker {
    fn unique_id(&self) -> Id {
        let id = self.unique_id.get();
        self.unique_id.set(id + 1);
        Id(id)
    }

    fn is_entity_enabled(&self, _id: Id, _level: log::Level) -> bool {
        false
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {}
    fn enter(&self, _id: Id, _object: Id) {}
    fn exit(&self, _id: Id, _object: Id) {}
    fn create(&self, _created_by: Id, _id: Id, _name: &str) {}
    fn destroy(&self, _destroyed_by: Id, _id: Id) {}
    fn connect(&self, _connect_from: Id, _connect_to: Id) {}
    fn log(&self, _id: Id, _level: log::Level, _msg: std::fmt::Arguments) {}
    fn time(&self, _set_by: Id, _time_ns: f64) {}
    fn shutdown(&self) {}
}
