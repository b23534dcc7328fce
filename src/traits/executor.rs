// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::model::{Task, TaskResult};

/// A path that takes a task all the way to its result.
///
/// Implemented by the scheduler handle (route through the dispatcher to
/// whichever endpoint owns the capability) and by the in-process
/// `LocalExecutor`. Plans drive their subtasks through this trait so nested
/// work takes the same path as top-level work.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Never fails: routing and execution problems come back as failure
    /// results for `task.id`.
    async fn execute(&self, task: Task) -> TaskResult;

    /// A result already recorded for `task_id` by whatever this executor
    /// routes to. Plans ask for it when a subtask depends on work that ran
    /// outside the plan.
    async fn recorded_result(&self, _task_id: &str) -> Option<TaskResult> {
        None
    }
}
