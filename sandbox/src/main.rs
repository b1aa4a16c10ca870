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

//! Sandbox example driving the Sable routine scheduler.
//!
//! A small scripted scene runs on a fixed 60 Hz timestep: an intro banner,
//! a patrol that detours through a nested sub-route, and a gate that opens
//! once the patrol has finished. Halfway through, the patrol is paused for
//! a second and resumed, demonstrating subtree pause semantics.

use anyhow::Result;
use sable_core::routine::{StepFailure, Steps, Yield};
use sable_routines::{RoutineEvent, RoutineScheduler};
use std::cell::Cell;
use std::rc::Rc;

/// Fixed simulation timestep, in seconds.
const TIMESTEP: f32 = 1.0 / 60.0;

/// A patrol leg: walk, detour through a waypoint sub-route, walk back,
/// then open the gate.
fn patrol_route(gate_open: Rc<Cell<bool>>) -> Result<Steps> {
    let waypoints = Steps::new(vec![Yield::seconds(0.5)?, Yield::seconds(0.5)?]);
    Ok(Steps::new(vec![
        Yield::seconds(1.0)?,
        Yield::nested(waypoints),
        Yield::seconds(1.0)?,
        Yield::until(move || {
            gate_open.set(true);
            true
        }),
    ]))
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut scheduler = RoutineScheduler::default();
    let events = scheduler.subscribe();

    let gate_open = Rc::new(Cell::new(false));

    // Intro banner: two beats, then done.
    scheduler.start_labeled(
        Steps::new(vec![Yield::seconds(0.5)?, Yield::seconds(0.5)?]),
        "intro",
    );

    // The patrol opens the gate when it completes its route.
    let patrol = scheduler.start_labeled(patrol_route(gate_open.clone())?, "patrol");

    // The gate waits on the patrol's flag.
    let gate_probe = gate_open.clone();
    scheduler.start_labeled(
        Steps::new(vec![
            Yield::until(move || gate_probe.get()),
            Yield::seconds(0.25)?,
        ]),
        "gate",
    );

    log::info!(
        "Scene started: {} routines registered.",
        scheduler.active_count()
    );

    let mut paused = false;
    let mut resumed = false;
    let mut frame = 0u32;

    while scheduler.active_count() > 0 {
        frame += 1;
        let elapsed = frame as f32 * TIMESTEP;

        // Freeze the patrol between seconds 1.2 and 2.2 of scene time.
        if !paused && elapsed >= 1.2 {
            log::info!("[{elapsed:.2}s] Pausing the patrol subtree.");
            scheduler.pause(patrol);
            paused = true;
        }
        if paused && !resumed && elapsed >= 2.2 {
            log::info!("[{elapsed:.2}s] Resuming the patrol subtree.");
            scheduler.resume(patrol);
            resumed = true;
        }

        scheduler.tick(TIMESTEP);

        for event in events.try_iter() {
            match event {
                RoutineEvent::Started { id, parent: None } => {
                    log::info!("[{elapsed:.2}s] {id} started.")
                }
                RoutineEvent::Started {
                    id,
                    parent: Some(parent),
                } => log::info!("[{elapsed:.2}s] {id} spawned by {parent}."),
                RoutineEvent::StateChanged { id, state } => {
                    log::debug!("[{elapsed:.2}s] {id} -> {state}.")
                }
                RoutineEvent::Failed { id, message } => {
                    log::warn!("[{elapsed:.2}s] {id} failed: {message}.")
                }
                RoutineEvent::Removed { id } => {
                    log::info!("[{elapsed:.2}s] {id} finished.")
                }
            }
        }
    }

    log::info!(
        "Scene complete after {frame} frames ({:.2}s of game time).",
        frame as f32 * TIMESTEP
    );

    // A throwaway routine demonstrating the failure policy: failures never
    // cross routine boundaries and the tick itself never fails.
    scheduler.start(|| -> Result<Option<Yield>, StepFailure> {
        Err("scripted failure for demonstration".into())
    });
    scheduler.tick(TIMESTEP);
    log::info!(
        "Failure demo done; scheduler is empty: {}.",
        scheduler.is_empty()
    );

    Ok(())
}
