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

//! Structured events emitted by the routine scheduler.

use sable_core::routine::{RoutineId, RoutineState};

/// A scheduler event published on the event bus.
///
/// The bus is an observation channel, not a control channel: consumers can
/// drain it whenever convenient, and a full buffer drops events rather than
/// stalling the tick.
#[derive(Debug, Clone)]
pub enum RoutineEvent {
    /// A routine was registered and advanced to its first yield.
    Started {
        /// The new routine.
        id: RoutineId,
        /// Its parent, when spawned as a nested routine.
        parent: Option<RoutineId>,
    },
    /// A routine's state field changed.
    StateChanged {
        /// The routine that transitioned.
        id: RoutineId,
        /// The state it transitioned into.
        state: RoutineState,
    },
    /// A step source or predicate raised a failure; the routine was completed.
    Failed {
        /// The routine whose step code failed.
        id: RoutineId,
        /// Rendered failure message.
        message: String,
    },
    /// A completed routine was removed from the registry.
    Removed {
        /// The routine that was removed.
        id: RoutineId,
    },
}
