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

//! Defines the hierarchy of error types for the routine subsystem.

use crate::routine::RoutineId;
use std::fmt;

/// Opaque failure raised by user-authored step code.
///
/// Step sources and fallible predicates report failures as boxed errors;
/// the scheduler logs them, completes the failing routine and keeps the
/// tick going.
pub type StepFailure = Box<dyn std::error::Error + Send + Sync>;

/// An error related to the construction or use of a single yield instruction.
#[derive(Debug)]
pub enum InstructionError {
    /// A `WaitForSeconds` was constructed with a negative or non-finite duration.
    InvalidDuration {
        /// The rejected duration, in seconds.
        seconds: f32,
    },
    /// The instruction was ticked after its disposal hook had already run.
    Disposed,
    /// A fallible `WaitUntil` predicate raised a failure when evaluated.
    PredicateFailed(StepFailure),
}

impl fmt::Display for InstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstructionError::InvalidDuration { seconds } => {
                write!(f, "Invalid wait duration: {seconds} seconds")
            }
            InstructionError::Disposed => {
                write!(f, "Yield instruction used after disposal")
            }
            InstructionError::PredicateFailed(err) => {
                write!(f, "Wait predicate failed: {err}")
            }
        }
    }
}

impl std::error::Error for InstructionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstructionError::PredicateFailed(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

/// A high-level error that can occur within the routine subsystem.
#[derive(Debug)]
pub enum RoutineError {
    /// An instruction was misused (invalid construction, use after dispose).
    Instruction(InstructionError),
    /// A step source or predicate raised a failure while a routine was advanced.
    StepFailed {
        /// The routine whose step code failed.
        id: RoutineId,
        /// The failure raised by the user code.
        source_error: StepFailure,
    },
}

impl fmt::Display for RoutineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineError::Instruction(err) => write!(f, "Instruction error: {err}"),
            RoutineError::StepFailed { id, source_error } => {
                write!(f, "Step source failed for {id}: {source_error}")
            }
        }
    }
}

impl std::error::Error for RoutineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoutineError::Instruction(err) => Some(err),
            RoutineError::StepFailed { source_error, .. } => Some(source_error.as_ref()),
        }
    }
}

impl From<InstructionError> for RoutineError {
    fn from(err: InstructionError) -> Self {
        RoutineError::Instruction(err)
    }
}
