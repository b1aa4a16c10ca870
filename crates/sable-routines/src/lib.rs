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

//! # Sable Routines
//!
//! The cooperative routine scheduler of the Sable Engine. Game logic
//! authors long-running, time-sliced behaviors as step-producing sequences
//! ([`StepSource`](sable_core::routine::StepSource)); the scheduler advances
//! every active routine once per engine tick, composes nested routines into
//! parent/child trees, and provides pause/resume/stop with full subtree
//! semantics.
//!
//! The scheduler is single-threaded by design: every mutation happens on
//! the thread that calls [`RoutineScheduler::tick`], and the types are
//! deliberately `!Send` so cross-thread use is rejected at compile time.
//! Code running *inside* a routine defers its mutations through the
//! [`RoutineCommands`] channel, which the scheduler drains at tick
//! boundaries.

#![warn(missing_docs)]

pub mod command;
pub mod event;
pub mod handle;
pub mod scheduler;

pub use command::RoutineCommands;
pub use event::RoutineEvent;
pub use scheduler::{RoutineScheduler, SchedulerConfig};
