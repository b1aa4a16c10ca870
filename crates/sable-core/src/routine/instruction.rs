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

//! The closed set of suspension primitives a routine can wait on.
//!
//! Every instruction exposes the same contract: `tick(dt)` returns `Ok(true)`
//! once the suspension has resolved (and keeps returning `Ok(true)` until
//! disposal), and `dispose()` runs the cleanup hook exactly once. Ticking a
//! disposed instruction is a programmer error surfaced eagerly.

use crate::routine::error::{InstructionError, StepFailure};
use crate::routine::RoutineId;
use std::fmt;

/// Waits until an accumulated amount of scaled game time has elapsed.
///
/// The elapsed counter only ever grows, and the resolution check is
/// `elapsed >= duration`, so a zero-duration wait resolves on its first
/// tick regardless of `dt`.
pub struct WaitForSeconds {
    duration: f32,
    elapsed: f32,
    done: bool,
    disposed: bool,
}

impl WaitForSeconds {
    /// Creates a wait for `duration` seconds.
    ///
    /// Negative and non-finite durations are rejected at construction.
    pub fn new(duration: f32) -> Result<Self, InstructionError> {
        if !duration.is_finite() || duration < 0.0 {
            return Err(InstructionError::InvalidDuration { seconds: duration });
        }
        Ok(Self {
            duration,
            elapsed: 0.0,
            done: false,
            disposed: false,
        })
    }

    /// Accumulates `dt` and reports whether the duration has elapsed.
    ///
    /// Once resolved the instruction stays resolved; further ticks keep
    /// returning `Ok(true)` until disposal.
    pub fn tick(&mut self, dt: f32) -> Result<bool, InstructionError> {
        if self.disposed {
            return Err(InstructionError::Disposed);
        }
        if self.done {
            return Ok(true);
        }
        self.elapsed += dt;
        self.done = self.elapsed >= self.duration;
        Ok(self.done)
    }

    /// Seconds accumulated so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// The duration this instruction waits for.
    pub fn duration(&self) -> f32 {
        self.duration
    }
}

impl fmt::Debug for WaitForSeconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitForSeconds")
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .field("done", &self.done)
            .finish()
    }
}

/// Boxed predicate polled by a [`WaitUntil`] instruction.
pub type Predicate = Box<dyn FnMut() -> Result<bool, StepFailure>>;

/// Waits until a user predicate returns `true`.
///
/// The predicate is the sole source of truth: its result is never cached,
/// and it is evaluated exactly once per tick. `dt` is ignored.
pub struct WaitUntil {
    predicate: Predicate,
    disposed: bool,
}

impl WaitUntil {
    /// Creates a wait on an infallible predicate.
    pub fn new(mut predicate: impl FnMut() -> bool + 'static) -> Self {
        Self {
            predicate: Box::new(move || Ok(predicate())),
            disposed: false,
        }
    }

    /// Creates a wait on a predicate that can fail.
    ///
    /// A failure is treated like a step-source failure: the owning routine
    /// is completed and the error is logged, without affecting siblings.
    pub fn fallible(predicate: impl FnMut() -> Result<bool, StepFailure> + 'static) -> Self {
        Self {
            predicate: Box::new(predicate),
            disposed: false,
        }
    }

    /// Evaluates the predicate once.
    pub fn tick(&mut self) -> Result<bool, InstructionError> {
        if self.disposed {
            return Err(InstructionError::Disposed);
        }
        (self.predicate)().map_err(InstructionError::PredicateFailed)
    }
}

impl fmt::Debug for WaitUntil {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitUntil")
            .field("disposed", &self.disposed)
            .finish()
    }
}

/// A suspension primitive held by a waiting routine.
///
/// The set is closed and fixed, so dispatch is a pattern match rather than
/// a capability trait. `Child` is produced by the scheduler itself when a
/// source yields a nested routine; its resolution is arbitrated by the
/// scheduler (the child set emptying), not by `tick`.
#[derive(Debug)]
pub enum YieldInstruction {
    /// Wait for a duration of scaled game time.
    Seconds(WaitForSeconds),
    /// Wait for a predicate to become true.
    Until(WaitUntil),
    /// Wait for a spawned child routine to complete.
    Child {
        /// Identifier of the child routine being waited on.
        id: RoutineId,
        /// Whether the disposal hook has run.
        disposed: bool,
    },
}

impl YieldInstruction {
    /// Advances the instruction by `dt` seconds of game time.
    ///
    /// Returns `Ok(true)` once the suspension has resolved. A `Child`
    /// instruction never resolves through `tick`; the scheduler resolves it
    /// when the child completes.
    pub fn tick(&mut self, dt: f32) -> Result<bool, InstructionError> {
        match self {
            YieldInstruction::Seconds(wait) => wait.tick(dt),
            YieldInstruction::Until(wait) => wait.tick(),
            YieldInstruction::Child { disposed, .. } => {
                if *disposed {
                    return Err(InstructionError::Disposed);
                }
                Ok(false)
            }
        }
    }

    /// Runs the disposal hook. Idempotent.
    pub fn dispose(&mut self) {
        match self {
            YieldInstruction::Seconds(wait) => wait.disposed = true,
            YieldInstruction::Until(wait) => wait.disposed = true,
            YieldInstruction::Child { disposed, .. } => *disposed = true,
        }
    }

    /// Whether the disposal hook has run.
    pub fn is_disposed(&self) -> bool {
        match self {
            YieldInstruction::Seconds(wait) => wait.disposed,
            YieldInstruction::Until(wait) => wait.disposed,
            YieldInstruction::Child { disposed, .. } => *disposed,
        }
    }

    /// Returns the child id if this is a `Child` wait.
    pub fn child_id(&self) -> Option<RoutineId> {
        match self {
            YieldInstruction::Child { id, .. } => Some(*id),
            _ => None,
        }
    }
}
