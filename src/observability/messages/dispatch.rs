// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the scheduler and dispatcher.
//!
//! This module contains message types for logging events related to:
//! * Scheduler start and shutdown
//! * Endpoint binding, replacement and removal
//! * Routing of ready tasks and recording of their results
//! * Orphaned tasks and their deadlines
//! * Rejected submissions

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Scheduler event loop started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::dispatch::SchedulerStarted;
/// use std::time::Duration;
///
/// let msg = SchedulerStarted {
///     max_dispatch_per_event: None,
///     orphan_timeout: Some(Duration::from_secs(30)),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct SchedulerStarted {
    pub max_dispatch_per_event: Option<usize>,
    pub orphan_timeout: Option<Duration>,
}

impl Display for SchedulerStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let limit = match self.max_dispatch_per_event {
            Some(limit) => limit.to_string(),
            None => "unlimited".to_string(),
        };
        let orphan = match self.orphan_timeout {
            Some(timeout) => format!("{:?}", timeout),
            None => "disabled".to_string(),
        };
        write!(
            f,
            "Scheduler started: max_dispatch_per_event={}, orphan_timeout={}",
            limit, orphan
        )
    }
}

impl StructuredLog for SchedulerStarted {
    fn log(&self) {
        tracing::info!(
            max_dispatch_per_event = ?self.max_dispatch_per_event,
            orphan_timeout_ms = ?self.orphan_timeout.map(|t| t.as_millis()),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "scheduler",
            span_name = name,
            max_dispatch_per_event = ?self.max_dispatch_per_event,
        )
    }
}

/// Scheduler event loop stopped; anything still pending is abandoned.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SchedulerStopped {
    pub pending: usize,
    pub in_flight: usize,
}

impl Display for SchedulerStopped {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduler stopped with {} pending and {} in-flight tasks",
            self.pending, self.in_flight
        )
    }
}

impl StructuredLog for SchedulerStopped {
    fn log(&self) {
        tracing::info!(pending = self.pending, in_flight = self.in_flight, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "scheduler",
            span_name = name,
            pending = self.pending,
            in_flight = self.in_flight,
        )
    }
}

/// An endpoint was bound to a capability key, possibly replacing another.
///
/// # Log Level
/// `info!` when the key was free, `warn!` when a binding was replaced
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::dispatch::EndpointBound;
///
/// let msg = EndpointBound {
///     capability: "shell",
///     endpoint_id: "worker-2",
///     replaced: Some("worker-1"),
/// };
///
/// assert!(msg.to_string().contains("replacing 'worker-1'"));
/// ```
pub struct EndpointBound<'a> {
    pub capability: &'a str,
    pub endpoint_id: &'a str,
    pub replaced: Option<&'a str>,
}

impl Display for EndpointBound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.replaced {
            Some(previous) => write!(
                f,
                "Endpoint '{}' bound to capability '{}', replacing '{}'",
                self.endpoint_id, self.capability, previous
            ),
            None => write!(
                f,
                "Endpoint '{}' bound to capability '{}'",
                self.endpoint_id, self.capability
            ),
        }
    }
}

impl StructuredLog for EndpointBound<'_> {
    fn log(&self) {
        match self.replaced {
            Some(previous) => tracing::warn!(
                capability = self.capability,
                endpoint_id = self.endpoint_id,
                replaced = previous,
                "{}", self
            ),
            None => tracing::info!(
                capability = self.capability,
                endpoint_id = self.endpoint_id,
                "{}", self
            ),
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "endpoint",
            span_name = name,
            capability = self.capability,
            endpoint_id = self.endpoint_id,
        )
    }
}

/// Endpoint removed from its capability key.
pub struct EndpointUnbound<'a> {
    pub capability: &'a str,
    pub endpoint_id: &'a str,
}

impl Display for EndpointUnbound<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Endpoint '{}' unbound from capability '{}'",
            self.endpoint_id, self.capability
        )
    }
}

impl StructuredLog for EndpointUnbound<'_> {
    fn log(&self) {
        tracing::info!(
            capability = self.capability,
            endpoint_id = self.endpoint_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "endpoint",
            span_name = name,
            capability = self.capability,
            endpoint_id = self.endpoint_id,
        )
    }
}

/// A ready task was sent to its endpoint.
///
/// # Log Level
/// `debug!` - Per-task detail
pub struct TaskDispatched<'a> {
    pub task_id: &'a str,
    pub capability: &'a str,
    pub endpoint_id: &'a str,
}

impl Display for TaskDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Task '{}' dispatched to endpoint '{}' ({})",
            self.task_id, self.endpoint_id, self.capability
        )
    }
}

impl StructuredLog for TaskDispatched<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            capability = self.capability,
            endpoint_id = self.endpoint_id,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "dispatch",
            span_name = name,
            task_id = self.task_id,
            capability = self.capability,
        )
    }
}

/// No endpoint is bound for the task's capability; it fails without
/// reaching a worker.
///
/// # Log Level
/// `warn!` - Task failed without being attempted
pub struct RoutingFailed<'a> {
    pub task_id: &'a str,
    pub capability: &'a str,
}

impl Display for RoutingFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No endpoint bound for capability '{}'; task '{}' failed",
            self.capability, self.task_id
        )
    }
}

impl StructuredLog for RoutingFailed<'_> {
    fn log(&self) {
        tracing::warn!(
            task_id = self.task_id,
            capability = self.capability,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "dispatch",
            span_name = name,
            task_id = self.task_id,
            capability = self.capability,
        )
    }
}

pub struct ResultRecorded<'a> {
    pub task_id: &'a str,
    pub success: bool,
    pub duration_ms: i64,
}

impl Display for ResultRecorded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let status = if self.success { "succeeded" } else { "failed" };
        write!(
            f,
            "Task '{}' {} after {}ms",
            self.task_id, status, self.duration_ms
        )
    }
}

impl StructuredLog for ResultRecorded<'_> {
    fn log(&self) {
        tracing::debug!(
            task_id = self.task_id,
            success = self.success,
            duration_ms = self.duration_ms,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("result", span_name = name, task_id = self.task_id)
    }
}

/// A second result arrived for a task that already has one.
///
/// # Log Level
/// `warn!` - Worker misbehaviour, result dropped
pub struct DuplicateResultDropped<'a> {
    pub task_id: &'a str,
}

impl Display for DuplicateResultDropped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dropping duplicate result for already completed task '{}'",
            self.task_id
        )
    }
}

impl StructuredLog for DuplicateResultDropped<'_> {
    fn log(&self) {
        tracing::warn!(task_id = self.task_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("result", span_name = name, task_id = self.task_id)
    }
}

/// In-flight tasks lost their endpoint.
///
/// # Log Level
/// `warn!` - Work may never complete
pub struct TasksOrphaned<'a> {
    pub capability: &'a str,
    pub endpoint_id: &'a str,
    pub count: usize,
}

impl Display for TasksOrphaned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} in-flight tasks orphaned by endpoint '{}' ({})",
            self.count, self.endpoint_id, self.capability
        )
    }
}

impl StructuredLog for TasksOrphaned<'_> {
    fn log(&self) {
        tracing::warn!(
            capability = self.capability,
            endpoint_id = self.endpoint_id,
            count = self.count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "orphan",
            span_name = name,
            capability = self.capability,
            endpoint_id = self.endpoint_id,
        )
    }
}

pub struct OrphanDeadlineExpired<'a> {
    pub task_id: &'a str,
    pub timeout: Duration,
}

impl Display for OrphanDeadlineExpired<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Orphaned task '{}' received no result within {:?}",
            self.task_id, self.timeout
        )
    }
}

impl StructuredLog for OrphanDeadlineExpired<'_> {
    fn log(&self) {
        tracing::warn!(
            task_id = self.task_id,
            timeout_ms = (self.timeout.as_millis() as u64),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("orphan", span_name = name, task_id = self.task_id)
    }
}

/// A submission failed validation and was not queued.
///
/// # Log Level
/// `warn!` - Caller error
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::dispatch::SubmissionRejected;
///
/// let msg = SubmissionRejected {
///     task_count: 2,
///     reason: "Duplicate task ID: 't1'",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct SubmissionRejected<'a> {
    pub task_count: usize,
    pub reason: &'a str,
}

impl Display for SubmissionRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected submission of {} tasks: {}",
            self.task_count, self.reason
        )
    }
}

impl StructuredLog for SubmissionRejected<'_> {
    fn log(&self) {
        tracing::warn!(task_count = self.task_count, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("submission", span_name = name, task_count = self.task_count)
    }
}
