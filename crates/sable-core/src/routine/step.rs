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

//! The producer side of the routine contract.
//!
//! A [`StepSource`] is a lazy, finite, non-restartable sequence of yielded
//! values. The scheduler pulls the next value with [`advance`], runs the
//! code between two yields to completion synchronously, and suspends the
//! routine on whatever was yielded. Authors either implement the trait on a
//! hand-written state machine, hand the scheduler a closure, or use the
//! [`Steps`] table when the sequence is static.
//!
//! [`advance`]: StepSource::advance

use crate::routine::error::{InstructionError, StepFailure};
use crate::routine::instruction::{WaitForSeconds, WaitUntil, YieldInstruction};
use std::collections::VecDeque;
use std::fmt;

/// A value yielded by a step source: either a suspension primitive or a
/// nested source the scheduler runs as a child routine.
pub enum Yield {
    /// Suspend on a yield instruction.
    Instruction(YieldInstruction),
    /// Spawn the given source as a child routine and wait for it.
    Nested(Box<dyn StepSource>),
}

impl Yield {
    /// Yields a wait for `duration` seconds of game time.
    ///
    /// ## Returns
    /// An error if the duration is negative or non-finite.
    pub fn seconds(duration: f32) -> Result<Self, InstructionError> {
        Ok(Yield::Instruction(YieldInstruction::Seconds(
            WaitForSeconds::new(duration)?,
        )))
    }

    /// Yields a wait on an infallible predicate.
    pub fn until(predicate: impl FnMut() -> bool + 'static) -> Self {
        Yield::Instruction(YieldInstruction::Until(WaitUntil::new(predicate)))
    }

    /// Yields a wait on a predicate that can fail.
    pub fn until_fallible(
        predicate: impl FnMut() -> Result<bool, StepFailure> + 'static,
    ) -> Self {
        Yield::Instruction(YieldInstruction::Until(WaitUntil::fallible(predicate)))
    }

    /// Yields a nested source to run as a child routine.
    pub fn nested(source: impl StepSource + 'static) -> Self {
        Yield::Nested(Box::new(source))
    }
}

impl fmt::Debug for Yield {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Yield::Instruction(instr) => f.debug_tuple("Instruction").field(instr).finish(),
            Yield::Nested(_) => f.debug_tuple("Nested").field(&"dyn StepSource").finish(),
        }
    }
}

/// Contract for something that produces a sequence of yielded values on
/// demand.
///
/// `advance` must be cheap and non-blocking; it is called at most once per
/// routine per tick. Returning `Ok(None)` terminates the routine. Returning
/// `Err` marks the routine failed: the scheduler logs the failure, completes
/// the routine and its descendants, and carries on with the tick.
pub trait StepSource {
    /// Pulls the next yielded value, or `None` when the sequence is over.
    fn advance(&mut self) -> Result<Option<Yield>, StepFailure>;
}

/// Closures are step sources, so ad-hoc sequences need no named type.
impl<F> StepSource for F
where
    F: FnMut() -> Result<Option<Yield>, StepFailure>,
{
    fn advance(&mut self) -> Result<Option<Yield>, StepFailure> {
        self()
    }
}

/// A step source backed by a pre-built table of yields.
///
/// Each `advance` pops the front of the table; the routine completes when
/// the table is exhausted.
#[derive(Debug, Default)]
pub struct Steps {
    queue: VecDeque<Yield>,
}

impl Steps {
    /// Creates a source from a list of yields, consumed front to back.
    pub fn new(steps: Vec<Yield>) -> Self {
        Self {
            queue: steps.into(),
        }
    }

    /// Number of yields not yet consumed.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl StepSource for Steps {
    fn advance(&mut self) -> Result<Option<Yield>, StepFailure> {
        Ok(self.queue.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_pop_in_order_then_terminate() {
        let mut steps = Steps::new(vec![
            Yield::seconds(1.0).unwrap(),
            Yield::until(|| true),
        ]);
        assert_eq!(steps.remaining(), 2);

        assert!(matches!(
            steps.advance().unwrap(),
            Some(Yield::Instruction(YieldInstruction::Seconds(_)))
        ));
        assert!(matches!(
            steps.advance().unwrap(),
            Some(Yield::Instruction(YieldInstruction::Until(_)))
        ));
        assert!(steps.advance().unwrap().is_none());
        // Non-restartable: stays exhausted.
        assert!(steps.advance().unwrap().is_none());
    }

    #[test]
    fn closures_are_step_sources() {
        let mut calls = 0;
        let mut source = move || -> Result<Option<Yield>, StepFailure> {
            calls += 1;
            if calls <= 2 {
                Ok(Some(Yield::seconds(0.0)?))
            } else {
                Ok(None)
            }
        };

        assert!(source.advance().unwrap().is_some());
        assert!(source.advance().unwrap().is_some());
        assert!(source.advance().unwrap().is_none());
    }

    #[test]
    fn failing_source_reports_its_error() {
        let mut source = || -> Result<Option<Yield>, StepFailure> { Err("no savegame".into()) };
        let err = source.advance().unwrap_err();
        assert_eq!(err.to_string(), "no savegame");
    }
}
