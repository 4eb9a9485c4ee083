// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::rc::Rc;

use sluice_track::entity::{Entity, toplevel};
use sluice_track::test_helpers::check_and_clear;
use sluice_track::{Unique, create_id, debug, enter, exit, test_init};

#[test]
fn create_and_destroy() {
    let (test_tracker, tracker) = test_init!(10);
    let top = toplevel(&tracker, "top");
    {
        let _kernel = Entity::new(&top, "kernel");
        check_and_clear(
            &test_tracker,
            &["0: created 10, top", "10: created 11, top::kernel"],
        );
    }
    check_and_clear(&test_tracker, &["10: destroyed 11"]);
}

#[test]
fn enter_exit_and_log() {
    let (test_tracker, tracker) = test_init!(100);
    let top = toplevel(&tracker, "top");
    let channel = Rc::new(Entity::new(&top, "channel"));
    check_and_clear(&test_tracker, &[".*top", ".*top::channel"]);

    let flit = create_id!(channel);
    enter!(channel ; flit);
    exit!(channel ; flit);
    enter!(channel ; 7_u64.id());
    debug!(channel ; "occupancy {}", 1);
    check_and_clear(
        &test_tracker,
        &[
            "101: 102 entered",
            "101: 102 exited",
            "101: 7 entered",
            "101:DEBUG: occupancy 1",
        ],
    );
}
