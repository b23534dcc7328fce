// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for plan execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A capability returned a plan and the runner attached to it.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::plan::PlanStarted;
///
/// let msg = PlanStarted { plan_id: "build" };
/// tracing::info!("{}", msg);
/// ```
pub struct PlanStarted<'a> {
    pub plan_id: &'a str,
}

impl Display for PlanStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Executing plan '{}'", self.plan_id)
    }
}

impl StructuredLog for PlanStarted<'_> {
    fn log(&self) {
        tracing::info!(plan_id = self.plan_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("plan", span_name = name, plan_id = self.plan_id)
    }
}

/// A nested plan was emitted and subscribed to.
pub struct NestedPlanAttached<'a> {
    pub plan_id: &'a str,
    pub nested_plan_id: &'a str,
    pub open_subscriptions: usize,
}

impl Display for NestedPlanAttached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Plan '{}' attached nested plan '{}' ({} open subscriptions)",
            self.plan_id, self.nested_plan_id, self.open_subscriptions
        )
    }
}

impl StructuredLog for NestedPlanAttached<'_> {
    fn log(&self) {
        tracing::debug!(
            plan_id = self.plan_id,
            nested_plan_id = self.nested_plan_id,
            open_subscriptions = self.open_subscriptions,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "plan",
            span_name = name,
            plan_id = self.plan_id,
            nested_plan_id = self.nested_plan_id,
        )
    }
}

/// A subtask produced a failure result. Siblings and dependents carry on.
///
/// # Log Level
/// `warn!` - Partial failure inside a plan
pub struct SubtaskFailed<'a> {
    pub plan_id: &'a str,
    pub task_id: &'a str,
    pub error: &'a str,
}

impl Display for SubtaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Subtask '{}' of plan '{}' failed: {}",
            self.task_id, self.plan_id, self.error
        )
    }
}

impl StructuredLog for SubtaskFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            plan_id = self.plan_id,
            task_id = self.task_id,
            error = self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "plan",
            span_name = name,
            plan_id = self.plan_id,
            task_id = self.task_id,
        )
    }
}

/// Every stream ended but some subtasks were still waiting on dependencies
/// that never appeared.
///
/// # Log Level
/// `error!` - Plan emitted an unsatisfiable graph
pub struct UnsatisfiableSubtasks<'a> {
    pub plan_id: &'a str,
    pub task_ids: &'a [&'a str],
}

impl Display for UnsatisfiableSubtasks<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Plan '{}' ended with {} unsatisfiable subtasks: {}",
            self.plan_id,
            self.task_ids.len(),
            self.task_ids.join(", ")
        )
    }
}

impl StructuredLog for UnsatisfiableSubtasks<'_> {
    fn log(&self) {
        tracing::error!(
            plan_id = self.plan_id,
            count = self.task_ids.len(),
            task_ids = self.task_ids.join(","),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!("plan", span_name = name, plan_id = self.plan_id)
    }
}

/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::plan::PlanCompleted;
/// use std::time::Duration;
///
/// let msg = PlanCompleted {
///     plan_id: "build",
///     subtasks: 4,
///     failed: 1,
///     duration: Duration::from_millis(250),
/// };
///
/// assert_eq!(msg.to_string(), "Plan 'build' executed: 4 subtasks, 1 failed in 250ms");
/// ```
pub struct PlanCompleted<'a> {
    pub plan_id: &'a str,
    pub subtasks: usize,
    pub failed: usize,
    pub duration: Duration,
}

impl Display for PlanCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Plan '{}' executed: {} subtasks, {} failed in {:?}",
            self.plan_id, self.subtasks, self.failed, self.duration
        )
    }
}

impl StructuredLog for PlanCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            plan_id = self.plan_id,
            subtasks = self.subtasks,
            failed = self.failed,
            duration_ms = (self.duration.as_millis() as u64),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("plan", span_name = name, plan_id = self.plan_id)
    }
}
