// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Value types flowing through the scheduler.
//!
//! Everything here is plain data: a [`Task`] is what a worker receives, a
//! [`TaskResult`] is what it sends back, a [`SubTask`] is a task that still
//! has to wait for (and derive its params from) other tasks, and a [`Plan`]
//! is a lazily produced stream of subtasks and nested plans.

mod plan;
mod submission;
mod task;

pub use plan::{Params, ParamsResolver, Plan, PlanEmitter, PlanItem, SubTask};
pub use submission::TaskSubmission;
pub use task::{CapabilityKey, FailureKind, Task, TaskFailure, TaskId, TaskOutcome, TaskResult};
