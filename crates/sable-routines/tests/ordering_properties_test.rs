// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Ordering and lifecycle properties of the routine scheduler.

use sable_core::routine::{RoutineState, StepFailure, StepSource, Steps, Yield};
use sable_routines::{RoutineEvent, RoutineScheduler};
use std::cell::RefCell;
use std::rc::Rc;

/// Step source that appends a tag to a shared trace on every advance, then
/// yields the steps it was given.
struct TracingSource {
    tag: &'static str,
    trace: Rc<RefCell<Vec<String>>>,
    steps: Steps,
}

impl TracingSource {
    fn new(tag: &'static str, trace: Rc<RefCell<Vec<String>>>, steps: Vec<Yield>) -> Self {
        Self {
            tag,
            trace,
            steps: Steps::new(steps),
        }
    }
}

impl StepSource for TracingSource {
    fn advance(&mut self) -> Result<Option<Yield>, StepFailure> {
        self.trace.borrow_mut().push(self.tag.to_string());
        self.steps.advance()
    }
}

#[test]
fn test_siblings_advance_in_insertion_order() {
    let mut scheduler = RoutineScheduler::default();
    let trace = Rc::new(RefCell::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        scheduler.start(TracingSource::new(
            tag,
            trace.clone(),
            vec![Yield::seconds(0.0).unwrap(), Yield::seconds(0.0).unwrap()],
        ));
    }
    trace.borrow_mut().clear(); // drop the registration advances

    scheduler.tick(0.1);
    assert_eq!(
        trace.borrow().as_slice(),
        &["first", "second", "third"],
        "siblings must advance in the order they were started"
    );
}

#[test]
fn test_child_advances_before_its_parent() {
    let mut scheduler = RoutineScheduler::default();
    let trace = Rc::new(RefCell::new(Vec::new()));

    let child_trace = trace.clone();
    let parent = TracingSource::new(
        "parent",
        trace.clone(),
        vec![
            Yield::nested(TracingSource::new(
                "child",
                child_trace,
                vec![Yield::seconds(0.0).unwrap()],
            )),
            Yield::seconds(0.0).unwrap(),
        ],
    );
    scheduler.start(parent);
    trace.borrow_mut().clear(); // registration: parent advance + child spawn advance

    // The child's terminating advance lands before the parent's next one.
    scheduler.tick(0.1);
    assert_eq!(trace.borrow().as_slice(), &["child", "parent"]);
}

#[test]
fn test_completion_is_monotonic() {
    let mut scheduler = RoutineScheduler::default();
    let id = scheduler.start(Steps::new(vec![Yield::seconds(0.5).unwrap()]));

    scheduler.stop(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Completed));

    // No operation brings a completed routine back.
    scheduler.pause(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Completed));
    scheduler.resume(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Completed));

    scheduler.tick(0.1);
    assert_eq!(scheduler.state(id), None, "slot freed at end of tick");
}

#[test]
fn test_cascade_completes_every_descendant_within_the_tick() {
    let mut scheduler = RoutineScheduler::default();

    // Three levels: grandparent -> parent -> child, all waiting.
    let script = Steps::new(vec![Yield::nested(Steps::new(vec![Yield::nested(
        Steps::new(vec![Yield::seconds(60.0).unwrap()]),
    )]))]);
    let root = scheduler.start(script);

    assert_eq!(scheduler.active_count(), 3, "whole chain spawned at start");

    let events = scheduler.subscribe();
    scheduler.stop(root);

    let completions = events
        .try_iter()
        .filter(|e| {
            matches!(
                e,
                RoutineEvent::StateChanged {
                    state: RoutineState::Completed,
                    ..
                }
            )
        })
        .count();
    assert_eq!(completions, 3, "every level of the tree completed");
    assert_eq!(scheduler.active_count(), 0);

    scheduler.tick(0.0);
    assert!(scheduler.is_empty());
}

#[test]
fn test_tick_zero_resolves_already_met_conditions() {
    let mut scheduler = RoutineScheduler::default();
    scheduler.start(Steps::new(vec![Yield::until(|| true)]));

    scheduler.tick(0.0);
    assert_eq!(
        scheduler.active_count(),
        0,
        "an already-true predicate must resolve on a zero-dt tick"
    );
}

#[test]
fn test_chained_zero_waits_terminate_under_zero_dt() {
    let mut scheduler = RoutineScheduler::default();
    scheduler.start(Steps::new(vec![
        Yield::seconds(0.0).unwrap(),
        Yield::seconds(0.0).unwrap(),
        Yield::seconds(0.0).unwrap(),
    ]));

    // One zero-duration wait resolves per tick; no tick loops forever.
    for _ in 0..3 {
        assert_eq!(scheduler.active_count(), 1);
        scheduler.tick(0.0);
    }
    assert_eq!(scheduler.active_count(), 0);
}

#[test]
fn test_pause_resume_round_trip_restores_state() {
    let mut scheduler = RoutineScheduler::default();
    let id = scheduler.start(Steps::new(vec![Yield::seconds(2.0).unwrap()]));
    assert_eq!(scheduler.state(id), Some(RoutineState::Waiting));

    scheduler.pause(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Paused));
    scheduler.resume(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Waiting));

    // A second round trip behaves identically.
    scheduler.pause(id);
    scheduler.resume(id);
    assert_eq!(scheduler.state(id), Some(RoutineState::Waiting));
}

#[test]
fn test_paused_child_keeps_its_parent_blocked() {
    let mut scheduler = RoutineScheduler::default();
    let events = scheduler.subscribe();
    let root = scheduler.start(Steps::new(vec![
        Yield::nested(Steps::new(vec![Yield::seconds(1.0).unwrap()])),
        Yield::seconds(0.0).unwrap(),
    ]));

    // Find the child id from the spawn event.
    let child = events
        .try_iter()
        .find_map(|e| match e {
            RoutineEvent::Started {
                id,
                parent: Some(_),
            } => Some(id),
            _ => None,
        })
        .expect("child spawned at registration");

    scheduler.pause(child);
    scheduler.tick(5.0);
    scheduler.tick(5.0);

    assert_eq!(scheduler.state(child), Some(RoutineState::Paused));
    assert_eq!(
        scheduler.state(root),
        Some(RoutineState::Waiting),
        "parent stays blocked while its child is paused"
    );

    scheduler.resume(child);
    scheduler.tick(1.1);
    scheduler.tick(0.1);
    assert_eq!(scheduler.active_count(), 0);
}
