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

//! The scheduler's per-routine record.

use sable_core::routine::{RoutineId, RoutineState, StepSource, YieldInstruction};
use std::fmt;

/// Identity and state for one routine owned by the scheduler.
///
/// The scheduler owns every handle exclusively; parents reference their
/// children by id only, so no ownership cycles can form. A handle in
/// `Completed` keeps its registry slot until the deferred-removal phase of
/// the tick that completed it.
pub struct RoutineHandle {
    /// Stable identifier, allocated monotonically.
    pub id: RoutineId,
    /// Optional label for O(n) lookup (`stop_by_label`).
    pub label: Option<String>,
    /// The step-producing sequence driving this routine.
    pub source: Box<dyn StepSource>,
    /// Current lifecycle state.
    pub state: RoutineState,
    /// State saved by `pause`, restored by `resume`. Always `Running` or
    /// `Waiting` while set.
    pub pre_pause_state: Option<RoutineState>,
    /// The instruction this routine is suspended on, if any.
    pub current_yield: Option<YieldInstruction>,
    /// Back-reference to the parent routine, by id only.
    pub parent: Option<RoutineId>,
    /// Live children, in spawn order.
    pub children: Vec<RoutineId>,
    /// True until the source has been advanced once.
    pub is_first_tick: bool,
    /// Once-only terminal flag set when the handle leaves the registry.
    pub disposed: bool,
}

impl RoutineHandle {
    /// Creates a fresh handle in `Initializing` for the given source.
    pub fn new(id: RoutineId, source: Box<dyn StepSource>, parent: Option<RoutineId>) -> Self {
        Self {
            id,
            label: None,
            source,
            state: RoutineState::Initializing,
            pre_pause_state: None,
            current_yield: None,
            parent,
            children: Vec::new(),
            is_first_tick: true,
            disposed: false,
        }
    }

    /// Returns `true` once the routine has reached its terminal state.
    pub fn is_completed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Disposes the current yield instruction, if any, and clears it.
    ///
    /// The disposal hook runs exactly once per instruction; calling this on
    /// a handle with no pending yield is a no-op.
    pub fn dispose_current_yield(&mut self) {
        if let Some(mut instr) = self.current_yield.take() {
            instr.dispose();
        }
    }
}

impl fmt::Debug for RoutineHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineHandle")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state)
            .field("pre_pause_state", &self.pre_pause_state)
            .field("current_yield", &self.current_yield)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("is_first_tick", &self.is_first_tick)
            .field("disposed", &self.disposed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::routine::Steps;

    #[test]
    fn fresh_handle_starts_initializing() {
        let handle = RoutineHandle::new(
            RoutineId::from_raw(1),
            Box::new(Steps::new(Vec::new())),
            None,
        );
        assert_eq!(handle.state, RoutineState::Initializing);
        assert!(handle.is_first_tick);
        assert!(!handle.disposed);
        assert!(handle.children.is_empty());
        assert!(handle.parent.is_none());
    }

    #[test]
    fn disposing_without_a_yield_is_a_no_op() {
        let mut handle = RoutineHandle::new(
            RoutineId::from_raw(1),
            Box::new(Steps::new(Vec::new())),
            None,
        );
        handle.dispose_current_yield();
        assert!(handle.current_yield.is_none());
    }
}
