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

//! # Routine primitives
//!
//! Core types and contracts for cooperative routines: time-sliced game
//! behaviors authored as step-producing sequences. A routine suspends
//! itself by yielding an instruction (wait a duration, wait for a
//! predicate, or run a nested routine to completion) and is advanced by
//! the scheduler once per engine tick.
//!
//! This module defines the *vocabulary* only: identifiers, states, yield
//! instructions and the [`StepSource`] producer contract. The scheduler
//! that drives them lives in `sable-routines`.

pub mod error;
pub mod instruction;
pub mod step;

pub use error::{InstructionError, RoutineError, StepFailure};
pub use instruction::{WaitForSeconds, WaitUntil, YieldInstruction};
pub use step::{StepSource, Steps, Yield};

use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a routine managed by the scheduler.
///
/// Ids are allocated from a monotonic counter and never recycled, so a
/// stale `RoutineId` can only ever refer to a routine that no longer
/// exists; operations on it are logged no-ops, never misdirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoutineId(u64);

impl RoutineId {
    /// Creates an id from its raw counter value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw counter value of this id.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RoutineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "routine#{}", self.0)
    }
}

/// The lifecycle state of a routine.
///
/// Transitions: `Initializing` moves to `Running`, `Waiting` or `Completed`
/// on the first source advance; `Running` and `Waiting` alternate as yields
/// are produced and resolved; any non-terminal state can be paused and
/// later restored; every path ends in `Completed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutineState {
    /// Created but not yet advanced to its first yield.
    Initializing,
    /// Unblocked; the source will be advanced on the current or next tick.
    Running,
    /// Blocked on a yield instruction or on live children.
    Waiting,
    /// Frozen by `pause`; the pre-pause state is saved for `resume`.
    Paused,
    /// Finished, failed or stopped. Terminal.
    Completed,
}

impl RoutineState {
    /// Returns `true` for the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoutineState::Completed)
    }

    /// Returns `true` if the routine can be paused from this state.
    pub fn is_pausable(&self) -> bool {
        matches!(self, RoutineState::Running | RoutineState::Waiting)
    }
}

impl std::fmt::Display for RoutineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routine_id_round_trips_raw_value() {
        let id = RoutineId::from_raw(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(format!("{id}"), "routine#42");
    }

    #[test]
    fn state_classification() {
        assert!(RoutineState::Completed.is_terminal());
        assert!(!RoutineState::Paused.is_terminal());

        assert!(RoutineState::Running.is_pausable());
        assert!(RoutineState::Waiting.is_pausable());
        assert!(!RoutineState::Initializing.is_pausable());
        assert!(!RoutineState::Paused.is_pausable());
        assert!(!RoutineState::Completed.is_pausable());
    }
}
