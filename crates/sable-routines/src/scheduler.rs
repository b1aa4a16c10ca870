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

//! Registry and per-tick driver for cooperative routines.
//!
//! The scheduler owns every routine handle exclusively and advances the
//! whole forest once per [`tick`](RoutineScheduler::tick): children before
//! their parent, siblings in insertion order, and each step source advanced
//! at most once per tick. Removal of completed routines is deferred to the
//! end of the tick so traversal never mutates the registry mid-iteration.

use crate::command::{RoutineCommand, RoutineCommands};
use crate::event::RoutineEvent;
use crate::handle::RoutineHandle;
use sable_core::event::EventBus;
use sable_core::routine::{
    RoutineError, RoutineId, RoutineState, StepFailure, StepSource, Yield, YieldInstruction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Configuration for the routine scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of events buffered on the event bus.
    /// If the buffer is full, new events are dropped.
    pub event_buffer_size: usize,
    /// Initial capacity of the handle registry.
    pub initial_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 256,
            initial_capacity: 64,
        }
    }
}

/// Synchronous fan-out callback invoked after a routine's state changes.
type StateObserver = Box<dyn Fn(RoutineId, RoutineState)>;

/// The cooperative routine scheduler.
///
/// Driven by the engine main loop through [`tick`](Self::tick) once per
/// frame. All operations must happen on the owning thread; the scheduler is
/// `!Send` because step sources and predicates are plain boxed closures, so
/// the compiler enforces this.
pub struct RoutineScheduler {
    handles: HashMap<RoutineId, RoutineHandle>,
    /// Root routines in insertion order; children are reached through their
    /// parent, never from here.
    roots: Vec<RoutineId>,
    /// Handles completed this tick, removed in the deferred drain.
    removals: Vec<RoutineId>,
    next_id: Arc<AtomicU64>,
    command_tx: flume::Sender<RoutineCommand>,
    command_rx: flume::Receiver<RoutineCommand>,
    observers: Vec<StateObserver>,
    events: EventBus<RoutineEvent>,
}

impl RoutineScheduler {
    /// Creates a scheduler with the given configuration.
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = flume::unbounded();
        Self {
            handles: HashMap::with_capacity(config.initial_capacity),
            roots: Vec::new(),
            removals: Vec::new(),
            next_id: Arc::new(AtomicU64::new(0)),
            command_tx,
            command_rx,
            observers: Vec::new(),
            events: EventBus::bounded(config.event_buffer_size),
        }
    }

    // --- Public operations ---

    /// Registers a new root routine and advances it to its first yield.
    ///
    /// The source runs synchronously up to its first yielded value, so the
    /// routine leaves `Initializing` before this returns.
    ///
    /// ## Returns
    /// The stable id of the new routine.
    pub fn start(&mut self, source: impl StepSource + 'static) -> RoutineId {
        let id = self.alloc_id();
        self.register(id, Box::new(source), None);
        id
    }

    /// Like [`start`](Self::start), with a label for later
    /// [`stop_by_label`](Self::stop_by_label) lookup.
    pub fn start_labeled(
        &mut self,
        source: impl StepSource + 'static,
        label: impl Into<String>,
    ) -> RoutineId {
        let id = self.alloc_id();
        self.register(id, Box::new(source), Some(label.into()));
        id
    }

    /// Stops a routine: marks it and every descendant `Completed`.
    ///
    /// The state change is immediate; registry slots are freed in the
    /// deferred-removal phase of the next tick. Stopping an unknown or
    /// already-completed routine is a logged no-op.
    pub fn stop(&mut self, id: RoutineId) {
        if !self.handles.contains_key(&id) {
            log::warn!("stop: {id} is not registered, ignoring.");
            return;
        }
        self.complete_subtree(id);
    }

    /// Stops every routine whose label matches. O(n) scan.
    ///
    /// ## Returns
    /// The number of routines stopped.
    pub fn stop_by_label(&mut self, label: &str) -> usize {
        let matches: Vec<RoutineId> = self
            .handles
            .values()
            .filter(|h| !h.is_completed() && h.label.as_deref() == Some(label))
            .map(|h| h.id)
            .collect();
        for id in &matches {
            self.complete_subtree(*id);
        }
        matches.len()
    }

    /// Stops every active routine.
    pub fn stop_all(&mut self) {
        let roots = self.roots.clone();
        for id in roots {
            self.complete_subtree(id);
        }
    }

    /// Pauses a routine and every descendant.
    ///
    /// Each handle saves its own state for later restore. Pausing a handle
    /// that is not `Running` or `Waiting` is a no-op.
    pub fn pause(&mut self, id: RoutineId) {
        let Some(handle) = self.handles.get_mut(&id) else {
            log::warn!("pause: {id} is not registered, ignoring.");
            return;
        };
        if !handle.state.is_pausable() {
            log::debug!("pause: {id} is {}, nothing to do.", handle.state);
            return;
        }
        handle.pre_pause_state = Some(handle.state);
        handle.state = RoutineState::Paused;
        let children = handle.children.clone();
        self.notify(id, RoutineState::Paused);
        for child in children {
            self.pause(child);
        }
    }

    /// Resumes a paused routine and every descendant.
    ///
    /// Each handle restores its own saved state. Resuming a handle that is
    /// not `Paused` is a no-op.
    pub fn resume(&mut self, id: RoutineId) {
        let Some(handle) = self.handles.get_mut(&id) else {
            log::warn!("resume: {id} is not registered, ignoring.");
            return;
        };
        if handle.state != RoutineState::Paused {
            log::debug!("resume: {id} is {}, nothing to do.", handle.state);
            return;
        }
        let restored = handle
            .pre_pause_state
            .take()
            .unwrap_or(RoutineState::Running);
        handle.state = restored;
        let children = handle.children.clone();
        self.notify(id, restored);
        for child in children {
            self.resume(child);
        }
    }

    /// Advances the whole routine forest by `dt` seconds of game time.
    ///
    /// Order per tick: drain deferred commands, traverse roots in insertion
    /// order (children before parent within each tree), drain commands
    /// enqueued during traversal, then free the slots of every routine that
    /// completed.
    pub fn tick(&mut self, dt: f32) {
        if !dt.is_finite() || dt < 0.0 {
            log::warn!("tick: invalid dt {dt}, skipping frame.");
            return;
        }
        self.drain_commands();
        let roots = self.roots.clone();
        for root in roots {
            self.process(root, dt);
        }
        self.drain_commands();
        self.drain_removals();
    }

    // --- Observation ---

    /// Number of routines not yet `Completed`.
    pub fn active_count(&self) -> usize {
        self.handles.values().filter(|h| !h.is_completed()).count()
    }

    /// Current state of a routine, if it is still registered.
    pub fn state(&self, id: RoutineId) -> Option<RoutineState> {
        self.handles.get(&id).map(|h| h.state)
    }

    /// Number of registered handles, including completed ones awaiting
    /// removal.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` if no handles are registered.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registers a synchronous callback invoked after every state change.
    pub fn on_state_change(&mut self, observer: impl Fn(RoutineId, RoutineState) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Returns a receiver for the structured scheduler event stream.
    pub fn subscribe(&self) -> flume::Receiver<RoutineEvent> {
        self.events.receiver()
    }

    /// Returns a cloneable sender for deferred mutations.
    ///
    /// Intended for code running inside step sources, predicates and
    /// observers; requests are drained at tick boundaries.
    pub fn commands(&self) -> RoutineCommands {
        RoutineCommands::new(self.command_tx.clone(), Arc::clone(&self.next_id))
    }

    // --- Per-tick algorithm ---

    /// Processes one handle: children first, then its yield instruction,
    /// then, if unblocked, one source advance.
    fn process(&mut self, id: RoutineId, dt: f32) {
        let Some(handle) = self.handles.get(&id) else {
            return;
        };
        if matches!(
            handle.state,
            RoutineState::Completed | RoutineState::Paused
        ) {
            return;
        }

        let children = handle.children.clone();
        for child in children {
            self.process(child, dt);
        }

        let Some(mut handle) = self.handles.remove(&id) else {
            return;
        };
        handle
            .children
            .retain(|cid| self.handles.get(cid).is_some_and(|c| !c.is_completed()));

        // Still blocked on a live child.
        if !handle.children.is_empty() {
            let was = handle.state;
            handle.state = RoutineState::Waiting;
            self.handles.insert(id, handle);
            if was != RoutineState::Waiting {
                self.notify(id, RoutineState::Waiting);
            }
            return;
        }

        if let Some(instr) = handle.current_yield.as_mut() {
            let resolved: Result<bool, StepFailure> = match instr {
                // The child set just emptied; that is the resolution.
                YieldInstruction::Child { .. } => Ok(true),
                other => other.tick(dt).map_err(Into::into),
            };
            match resolved {
                Err(err) => {
                    self.fail(&mut handle, err);
                    self.handles.insert(id, handle);
                    return;
                }
                Ok(false) => {
                    self.handles.insert(id, handle);
                    return;
                }
                Ok(true) => {
                    handle.dispose_current_yield();
                    handle.state = RoutineState::Running;
                    self.notify(id, RoutineState::Running);
                }
            }
        }

        self.advance_source(&mut handle);
        self.handles.insert(id, handle);
    }

    /// Pulls the next yielded value from the handle's source. Called at
    /// most once per handle per tick, and once at registration/spawn.
    fn advance_source(&mut self, handle: &mut RoutineHandle) {
        handle.is_first_tick = false;
        let id = handle.id;
        match handle.source.advance() {
            Err(err) => self.fail(handle, err),
            Ok(None) => {
                handle.state = RoutineState::Completed;
                self.removals.push(id);
                self.notify(id, RoutineState::Completed);
                log::debug!("{id} ran to completion.");
            }
            Ok(Some(Yield::Instruction(instr))) => {
                if instr.child_id().is_some() {
                    // Child waits are created by the scheduler, never yielded.
                    self.fail(handle, "yielded a scheduler-internal child wait".into());
                    return;
                }
                handle.current_yield = Some(instr);
                handle.state = RoutineState::Waiting;
                self.notify(id, RoutineState::Waiting);
            }
            Ok(Some(Yield::Nested(source))) => {
                let child_id = self.alloc_id();
                let mut child = RoutineHandle::new(child_id, source, Some(id));
                handle.children.push(child_id);
                handle.current_yield = Some(YieldInstruction::Child {
                    id: child_id,
                    disposed: false,
                });
                handle.state = RoutineState::Waiting;
                self.notify(id, RoutineState::Waiting);
                self.events.publish(RoutineEvent::Started {
                    id: child_id,
                    parent: Some(id),
                });
                log::debug!("{id} spawned child {child_id}.");
                // The child runs to its first yield now, inside its parent's
                // slot, and is not traversed again this tick.
                self.advance_source(&mut child);
                self.handles.insert(child_id, child);
            }
        }
    }

    /// Applies the step-failure policy: log with the routine id, complete
    /// the routine and its descendants, keep the tick going.
    fn fail(&mut self, handle: &mut RoutineHandle, source_error: StepFailure) {
        let err = RoutineError::StepFailed {
            id: handle.id,
            source_error,
        };
        log::error!("{err}");
        self.events.publish(RoutineEvent::Failed {
            id: handle.id,
            message: err.to_string(),
        });
        handle.dispose_current_yield();
        let children = std::mem::take(&mut handle.children);
        for child in children {
            self.complete_subtree(child);
        }
        handle.state = RoutineState::Completed;
        self.removals.push(handle.id);
        self.notify(handle.id, RoutineState::Completed);
    }

    /// Marks a registered handle and all descendants `Completed`, disposing
    /// each pending yield exactly once.
    fn complete_subtree(&mut self, id: RoutineId) {
        let Some(handle) = self.handles.get_mut(&id) else {
            return;
        };
        if handle.is_completed() {
            return;
        }
        handle.dispose_current_yield();
        handle.pre_pause_state = None;
        handle.state = RoutineState::Completed;
        let children = std::mem::take(&mut handle.children);
        self.removals.push(id);
        self.notify(id, RoutineState::Completed);
        for child in children {
            self.complete_subtree(child);
        }
    }

    // --- Deferred mutation ---

    /// Applies every queued command. Runs at tick boundaries only.
    fn drain_commands(&mut self) {
        while let Ok(command) = self.command_rx.try_recv() {
            log::trace!("Applying deferred command: {command:?}");
            match command {
                RoutineCommand::Start { id, source, label } => self.register(id, source, label),
                RoutineCommand::Stop(id) => self.stop(id),
                RoutineCommand::StopAll => self.stop_all(),
                RoutineCommand::Pause(id) => self.pause(id),
                RoutineCommand::Resume(id) => self.resume(id),
            }
        }
    }

    /// Frees the registry slot of every routine completed this tick and
    /// detaches it from its parent's child list.
    fn drain_removals(&mut self) {
        if self.removals.is_empty() {
            return;
        }
        let removals = std::mem::take(&mut self.removals);
        for id in &removals {
            // A subtree stop can queue an id more than once; the second
            // remove finds nothing.
            let Some(mut handle) = self.handles.remove(id) else {
                continue;
            };
            handle.disposed = true;
            if let Some(parent) = handle.parent {
                if let Some(p) = self.handles.get_mut(&parent) {
                    p.children.retain(|c| c != id);
                }
            }
            self.events.publish(RoutineEvent::Removed { id: *id });
            log::trace!("{id} removed from registry.");
        }
        self.roots.retain(|r| self.handles.contains_key(r));
    }

    // --- Internals ---

    fn alloc_id(&self) -> RoutineId {
        RoutineId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a root handle and advances it to its first yield.
    fn register(&mut self, id: RoutineId, source: Box<dyn StepSource>, label: Option<String>) {
        log::debug!(
            "Starting {id}{}.",
            label
                .as_deref()
                .map(|l| format!(" (label: {l})"))
                .unwrap_or_default()
        );
        let mut handle = RoutineHandle::new(id, source, None);
        handle.label = label;
        self.roots.push(id);
        self.events.publish(RoutineEvent::Started { id, parent: None });
        self.advance_source(&mut handle);
        self.handles.insert(id, handle);
    }

    /// Fans out a state change to observers and the event bus. Called after
    /// the state field has been updated.
    fn notify(&self, id: RoutineId, state: RoutineState) {
        log::trace!("{id} -> {state}");
        for observer in &self.observers {
            observer(id, state);
        }
        self.events
            .publish(RoutineEvent::StateChanged { id, state });
    }
}

impl Default for RoutineScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl std::fmt::Debug for RoutineScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineScheduler")
            .field("handles", &self.handles.len())
            .field("roots", &self.roots)
            .field("pending_removals", &self.removals.len())
            .finish()
    }
}
