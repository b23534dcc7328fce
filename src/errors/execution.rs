// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while producing a task's result.
//!
//! None of these escape the scheduler: each one is caught at the scope of the
//! task it belongs to and turned into a failure `TaskResult` for that id.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// A capability reported that it could not do the work.
    #[error("capability '{capability}' failed: {message}")]
    CapabilityFailed { capability: String, message: String },

    /// A params resolver rejected its dependency results.
    #[error("could not resolve params for task '{task_id}': {message}")]
    ResolverFailed { task_id: String, message: String },

    /// A dependency's result was not recorded when params were resolved.
    #[error("task '{task_id}' depends on '{dependency}' which has no recorded result")]
    MissingDependencyResult { task_id: String, dependency: String },
}

impl ExecutionError {
    pub fn capability(capability: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionError::CapabilityFailed {
            capability: capability.into(),
            message: message.into(),
        }
    }

    pub fn resolver(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        ExecutionError::ResolverFailed {
            task_id: task_id.into(),
            message: message.into(),
        }
    }
}
