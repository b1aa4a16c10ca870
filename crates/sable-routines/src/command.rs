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

//! Deferred mutation of the scheduler from inside routine code.
//!
//! Step sources, predicates and observers hold no reference to the
//! scheduler (its exclusive borrow during `tick` makes that
//! unrepresentable). What they can hold is a [`RoutineCommands`] sender:
//! requests enqueued here are drained by the scheduler at tick boundaries,
//! never mid-traversal, which keeps iteration safe and ordering
//! predictable.

use sable_core::routine::{RoutineId, StepSource};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A deferred mutation request.
pub enum RoutineCommand {
    /// Register a new root routine.
    Start {
        /// Id pre-allocated for the new routine.
        id: RoutineId,
        /// The source to drive.
        source: Box<dyn StepSource>,
        /// Optional label for later `stop_by_label` lookup.
        label: Option<String>,
    },
    /// Stop a routine and its descendants.
    Stop(RoutineId),
    /// Stop every active routine.
    StopAll,
    /// Pause a routine and its descendants.
    Pause(RoutineId),
    /// Resume a paused routine and its descendants.
    Resume(RoutineId),
}

impl fmt::Debug for RoutineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutineCommand::Start { id, label, .. } => f
                .debug_struct("Start")
                .field("id", id)
                .field("label", label)
                .finish(),
            RoutineCommand::Stop(id) => f.debug_tuple("Stop").field(id).finish(),
            RoutineCommand::StopAll => write!(f, "StopAll"),
            RoutineCommand::Pause(id) => f.debug_tuple("Pause").field(id).finish(),
            RoutineCommand::Resume(id) => f.debug_tuple("Resume").field(id).finish(),
        }
    }
}

/// Cloneable handle for enqueueing deferred scheduler mutations.
///
/// Ids for deferred starts are allocated eagerly from the scheduler's
/// shared counter, so the caller can retain the `RoutineId` of a routine
/// that will only exist after the next drain.
#[derive(Clone)]
pub struct RoutineCommands {
    sender: flume::Sender<RoutineCommand>,
    next_id: Arc<AtomicU64>,
}

impl RoutineCommands {
    pub(crate) fn new(sender: flume::Sender<RoutineCommand>, next_id: Arc<AtomicU64>) -> Self {
        Self { sender, next_id }
    }

    fn alloc_id(&self) -> RoutineId {
        RoutineId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn send(&self, command: RoutineCommand) {
        if let Err(e) = self.sender.send(command) {
            log::warn!("Routine command dropped, scheduler is gone: {e:?}");
        }
    }

    /// Requests a new root routine; it is registered at the next drain.
    ///
    /// ## Returns
    /// The id the routine will carry once registered.
    pub fn start(&self, source: impl StepSource + 'static) -> RoutineId {
        let id = self.alloc_id();
        self.send(RoutineCommand::Start {
            id,
            source: Box::new(source),
            label: None,
        });
        id
    }

    /// Like [`start`](Self::start), with a label for `stop_by_label`.
    pub fn start_labeled(
        &self,
        source: impl StepSource + 'static,
        label: impl Into<String>,
    ) -> RoutineId {
        let id = self.alloc_id();
        self.send(RoutineCommand::Start {
            id,
            source: Box::new(source),
            label: Some(label.into()),
        });
        id
    }

    /// Requests that a routine and its descendants be stopped.
    pub fn stop(&self, id: RoutineId) {
        self.send(RoutineCommand::Stop(id));
    }

    /// Requests that every active routine be stopped.
    pub fn stop_all(&self) {
        self.send(RoutineCommand::StopAll);
    }

    /// Requests that a routine and its descendants be paused.
    pub fn pause(&self, id: RoutineId) {
        self.send(RoutineCommand::Pause(id));
    }

    /// Requests that a paused routine and its descendants be resumed.
    pub fn resume(&self, id: RoutineId) {
        self.send(RoutineCommand::Resume(id));
    }
}

impl fmt::Debug for RoutineCommands {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineCommands")
            .field("queued", &self.sender.len())
            .finish()
    }
}
