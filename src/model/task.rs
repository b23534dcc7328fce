// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier of a task, unique within one scheduler.
pub type TaskId = String;

/// Identifier of the kind of worker a task needs (e.g. `"shell"`).
pub type CapabilityKey = String;

/// A unit of work with fully resolved params, ready to be sent to a worker.
///
/// Tasks are immutable once enqueued; the scheduler only ever moves them
/// between the queue, the in-flight table and the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub executor: CapabilityKey,
    pub params: Value,
    /// Id of the plan that produced this task, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<TaskId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, executor: impl Into<CapabilityKey>, params: Value) -> Self {
        Self {
            id: id.into(),
            executor: executor.into(),
            params,
            plan_id: None,
        }
    }

    pub fn with_plan(mut self, plan_id: impl Into<TaskId>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }
}

/// Why a task failed.
///
/// All kinds are failure-shaped results; the kind only lets an observer tell
/// "never reached a worker" apart from "executed and failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No endpoint was bound for the task's capability key.
    Routing,
    /// The capability (or the params resolver) reported an error.
    Execution,
    /// The endpoint the task was sent to went away before answering.
    Orphaned,
    /// The task waited on dependencies that can never complete.
    Unsatisfiable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Routing => "routing",
            FailureKind::Execution => "execution",
            FailureKind::Orphaned => "orphaned",
            FailureKind::Unsatisfiable => "unsatisfiable",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of a task, explicitly tagged on the wire as `"status"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success { data: Value },
    Failure { error: TaskFailure },
}

/// The single result produced for a dispatched task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub id: TaskId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub outcome: TaskOutcome,
}

impl TaskResult {
    /// Successful result ending now.
    pub fn success(id: impl Into<TaskId>, start: DateTime<Utc>, data: Value) -> Self {
        Self {
            id: id.into(),
            start,
            end: Utc::now(),
            outcome: TaskOutcome::Success { data },
        }
    }

    /// Failed result ending now.
    pub fn failure(
        id: impl Into<TaskId>,
        start: DateTime<Utc>,
        kind: FailureKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end: Utc::now(),
            outcome: TaskOutcome::Failure {
                error: TaskFailure {
                    kind,
                    message: message.into(),
                },
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, TaskOutcome::Success { .. })
    }

    /// Data of a successful result.
    pub fn data(&self) -> Option<&Value> {
        match &self.outcome {
            TaskOutcome::Success { data } => Some(data),
            TaskOutcome::Failure { .. } => None,
        }
    }

    /// Error payload of a failed result.
    pub fn error(&self) -> Option<&TaskFailure> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { error } => Some(error),
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}
