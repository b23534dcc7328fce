// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Synchronous dispatch core.
//!
//! The [`Dispatcher`] owns the ready queue, the capability bindings and the
//! result map. It never awaits: each method handles one event (enqueue,
//! result, bind, unbind, orphan deadline) to completion, then runs a
//! dispatch cycle. [`crate::engine::Scheduler`] serializes events onto it
//! from a single task, so no locking is involved.
//!
//! # Dispatch cycle
//!
//! Ready tasks are dequeued until the queue has nothing ready, or until
//! [`DispatchOptions::max_dispatch_per_event`] tasks have been handed to
//! endpoints. For each one:
//!
//! 1. Params are resolved against recorded results. A resolver error fails
//!    the task with [`FailureKind::Execution`].
//! 2. No binding for the capability key fails the task with
//!    [`FailureKind::Routing`]; no worker is contacted.
//! 3. Otherwise the task is sent to the bound endpoint and tracked as in
//!    flight. A closed endpoint channel unbinds the endpoint and fails the
//!    task with [`FailureKind::Routing`].
//!
//! Failures are recorded like any other result: they unblock dependents and
//! are published to subscribers. A task failed inside the cycle counts as its
//! own event, so it does not use up the cycle's budget and its dependents
//! are picked up by the same cycle.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::consts::DEFAULT_ORPHAN_TIMEOUT_SECONDS;
use crate::engine::endpoint::BindingId;
use crate::engine::ready_queue::ReadyQueue;
use crate::engine::validation::validate_submission;
use crate::errors::SubmissionError;
use crate::model::{CapabilityKey, FailureKind, SubTask, Task, TaskId, TaskResult};
use crate::observability::messages::dispatch::{
    DuplicateResultDropped, EndpointBound, EndpointUnbound, OrphanDeadlineExpired,
    ResultRecorded, RoutingFailed, SubmissionRejected, TaskDispatched, TasksOrphaned,
};
use crate::observability::messages::StructuredLog;

/// Results buffered per subscriber before a slow one starts lagging.
pub const RESULT_BROADCAST_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Upper bound on tasks sent to endpoints per triggering event. `None`
    /// drains every ready task; `Some(1)` sends one task per event.
    pub max_dispatch_per_event: Option<usize>,
    /// How long an orphaned in-flight task may wait for a late result
    /// before failing. `None` leaves orphans in flight indefinitely.
    pub orphan_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            max_dispatch_per_event: None,
            orphan_timeout: Some(Duration::from_secs(DEFAULT_ORPHAN_TIMEOUT_SECONDS)),
        }
    }
}

/// A capability key and the endpoint currently serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityBinding {
    pub capability: CapabilityKey,
    pub endpoint_id: String,
    pub binding: BindingId,
}

#[derive(Debug)]
struct Binding {
    id: BindingId,
    endpoint_id: String,
    tasks: mpsc::UnboundedSender<Task>,
}

#[derive(Debug)]
struct InFlight {
    binding: BindingId,
    start: DateTime<Utc>,
    orphaned: bool,
}

#[derive(Debug)]
pub struct Dispatcher {
    options: DispatchOptions,
    queue: ReadyQueue<SubTask>,
    bindings: HashMap<CapabilityKey, Binding>,
    results: HashMap<TaskId, TaskResult>,
    in_flight: HashMap<TaskId, InFlight>,
    waiters: HashMap<TaskId, Vec<oneshot::Sender<TaskResult>>>,
    newly_orphaned: Vec<TaskId>,
    publisher: broadcast::Sender<TaskResult>,
    next_binding: BindingId,
}

impl Dispatcher {
    pub fn new(options: DispatchOptions) -> Self {
        let (publisher, _) = broadcast::channel(RESULT_BROADCAST_CAPACITY);
        Self {
            options,
            queue: ReadyQueue::new(),
            bindings: HashMap::new(),
            results: HashMap::new(),
            in_flight: HashMap::new(),
            waiters: HashMap::new(),
            newly_orphaned: Vec::new(),
            publisher,
            next_binding: 0,
        }
    }

    pub fn options(&self) -> &DispatchOptions {
        &self.options
    }

    /// A sender for the result feed, for handing out subscriptions.
    pub fn publisher(&self) -> broadcast::Sender<TaskResult> {
        self.publisher.clone()
    }

    /// Every result recorded from now on, including routing failures.
    pub fn subscribe(&self) -> broadcast::Receiver<TaskResult> {
        self.publisher.subscribe()
    }

    /// Binds an endpoint to `capability`, replacing any previous binding.
    ///
    /// Tasks in flight on a replaced endpoint become orphaned; collect them
    /// with [`Dispatcher::take_orphaned`].
    pub fn bind(
        &mut self,
        capability: impl Into<CapabilityKey>,
        endpoint_id: impl Into<String>,
        tasks: mpsc::UnboundedSender<Task>,
    ) -> BindingId {
        let capability = capability.into();
        self.next_binding += 1;
        let binding = Binding {
            id: self.next_binding,
            endpoint_id: endpoint_id.into(),
            tasks,
        };
        let binding_id = binding.id;

        let previous = self.bindings.insert(capability.clone(), binding);
        EndpointBound {
            capability: &capability,
            endpoint_id: &self.bindings[&capability].endpoint_id,
            replaced: previous.as_ref().map(|b| b.endpoint_id.as_str()),
        }
        .log();

        if let Some(previous) = previous {
            self.orphan_binding(&capability, &previous);
        }
        self.dispatch_ready();
        binding_id
    }

    /// Removes the binding for `capability`. With `Some(binding)` the key is
    /// only unbound if it is still held by that binding.
    ///
    /// Returns whether a binding was removed.
    pub fn unbind(&mut self, capability: &str, binding: Option<BindingId>) -> bool {
        let matches = match (self.bindings.get(capability), binding) {
            (Some(current), Some(expected)) => current.id == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return false;
        }

        match self.bindings.remove(capability) {
            Some(removed) => {
                EndpointUnbound {
                    capability,
                    endpoint_id: &removed.endpoint_id,
                }
                .log();
                self.orphan_binding(capability, &removed);
                true
            }
            None => false,
        }
    }

    /// Whether `binding` is still the live binding for some key.
    pub fn is_live(&self, binding: BindingId) -> bool {
        self.bindings.values().any(|b| b.id == binding)
    }

    /// Ids orphaned since the last call.
    pub fn take_orphaned(&mut self) -> Vec<TaskId> {
        std::mem::take(&mut self.newly_orphaned)
    }

    /// Validates and queues a batch, then runs a dispatch cycle.
    ///
    /// Nothing is queued if any task in the batch is rejected.
    pub fn submit(&mut self, batch: Vec<SubTask>) -> Result<(), SubmissionError> {
        if let Err(errors) = validate_submission(&batch, &self.known_ids()) {
            let err = SubmissionError::Invalid { errors };
            SubmissionRejected {
                task_count: batch.len(),
                reason: &err.to_string(),
            }
            .log();
            return Err(err);
        }

        for task in batch {
            self.queue.enqueue(task);
        }
        self.dispatch_ready();
        Ok(())
    }

    /// Queues without validation, then runs a dispatch cycle.
    pub fn enqueue(&mut self, task: SubTask) {
        self.queue.enqueue(task);
        self.dispatch_ready();
    }

    /// Records a result delivered by the endpoint bound as `binding`.
    ///
    /// Results from a binding that has since been replaced or removed are
    /// dropped; those tasks resolve through the orphan deadline instead.
    pub fn accept_result(&mut self, binding: BindingId, result: TaskResult) -> bool {
        if !self.is_live(binding) {
            tracing::debug!(
                task_id = %result.id,
                binding,
                "dropping result from a stale endpoint binding"
            );
            return false;
        }
        self.record_result(result)
    }

    /// Records a result, marks the id completed, publishes it and runs a
    /// dispatch cycle. A second result for the same id is dropped.
    pub fn record_result(&mut self, result: TaskResult) -> bool {
        if !self.complete(result) {
            return false;
        }
        self.dispatch_ready();
        true
    }

    /// Fails each listed task that is still orphaned and unanswered.
    pub fn expire_orphans(&mut self, task_ids: &[TaskId], timeout: Duration) -> usize {
        let mut expired = 0;
        for task_id in task_ids {
            let start = match self.in_flight.get(task_id) {
                Some(entry) if entry.orphaned => entry.start,
                _ => continue,
            };

            OrphanDeadlineExpired { task_id, timeout }.log();
            self.complete(TaskResult::failure(
                task_id.clone(),
                start,
                FailureKind::Orphaned,
                format!(
                    "endpoint went away and no result arrived within {:?}",
                    timeout
                ),
            ));
            expired += 1;
        }

        if expired > 0 {
            self.dispatch_ready();
        }
        expired
    }

    pub fn status(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// Delivers the result for `task_id` to `waiter`, now if it is already
    /// recorded, otherwise when it arrives.
    pub fn wait_for(&mut self, task_id: &str, waiter: oneshot::Sender<TaskResult>) {
        match self.results.get(task_id) {
            Some(result) => {
                let _ = waiter.send(result.clone());
            }
            None => {
                let waiters = self.waiters.entry(task_id.to_string()).or_default();
                // callers that gave up waiting
                waiters.retain(|w| !w.is_closed());
                waiters.push(waiter);
            }
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Current bindings, sorted by capability key.
    pub fn capabilities(&self) -> Vec<CapabilityBinding> {
        let mut bindings: Vec<CapabilityBinding> = self
            .bindings
            .iter()
            .map(|(capability, binding)| CapabilityBinding {
                capability: capability.clone(),
                endpoint_id: binding.endpoint_id.clone(),
                binding: binding.id,
            })
            .collect();
        bindings.sort_by(|a, b| a.capability.cmp(&b.capability));
        bindings
    }

    /// Every id the dispatcher is tracking: queued, in flight or finished.
    pub fn known_ids(&self) -> HashSet<TaskId> {
        self.results
            .keys()
            .chain(self.in_flight.keys())
            .cloned()
            .chain(self.queue.pending().map(|task| task.id.clone()))
            .collect()
    }

    fn orphan_binding(&mut self, capability: &str, binding: &Binding) {
        let orphaned: Vec<TaskId> = self
            .in_flight
            .iter_mut()
            .filter(|(_, entry)| entry.binding == binding.id && !entry.orphaned)
            .map(|(task_id, entry)| {
                entry.orphaned = true;
                task_id.clone()
            })
            .collect();

        if !orphaned.is_empty() {
            TasksOrphaned {
                capability,
                endpoint_id: &binding.endpoint_id,
                count: orphaned.len(),
            }
            .log();
            self.newly_orphaned.extend(orphaned);
        }
    }

    fn complete(&mut self, result: TaskResult) -> bool {
        if self.results.contains_key(&result.id) {
            DuplicateResultDropped {
                task_id: &result.id,
            }
            .log();
            return false;
        }

        self.in_flight.remove(&result.id);
        self.queue.mark_completed(&result.id);
        ResultRecorded {
            task_id: &result.id,
            success: result.is_success(),
            duration_ms: result.duration().num_milliseconds(),
        }
        .log();

        if let Some(waiters) = self.waiters.remove(&result.id) {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }
        // no subscribers is fine
        let _ = self.publisher.send(result.clone());
        self.results.insert(result.id.clone(), result);
        true
    }

    fn dispatch_ready(&mut self) -> usize {
        let limit = self.options.max_dispatch_per_event.unwrap_or(usize::MAX);
        let mut sent = 0;
        while sent < limit {
            let Some(subtask) = self.queue.dequeue() else {
                break;
            };
            if self.dispatch(subtask) {
                sent += 1;
            }
        }
        sent
    }

    /// Returns whether the task reached an endpoint. Anything else has
    /// already been completed with a failure.
    fn dispatch(&mut self, subtask: SubTask) -> bool {
        let start = Utc::now();
        let task = match subtask.resolve(&self.results) {
            Ok(task) => task,
            Err(e) => {
                self.complete(TaskResult::failure(
                    subtask.id,
                    start,
                    FailureKind::Execution,
                    e.to_string(),
                ));
                return false;
            }
        };

        let task_id = task.id.clone();
        let capability = task.executor.clone();
        let (binding_id, endpoint_id, sent) = match self.bindings.get(&capability) {
            Some(binding) => (
                binding.id,
                binding.endpoint_id.clone(),
                binding.tasks.send(task).is_ok(),
            ),
            None => {
                RoutingFailed {
                    task_id: &task_id,
                    capability: &capability,
                }
                .log();
                self.complete(TaskResult::failure(
                    task_id,
                    start,
                    FailureKind::Routing,
                    format!("no endpoint registered for capability '{}'", capability),
                ));
                return false;
            }
        };

        if !sent {
            self.unbind(&capability, Some(binding_id));
            RoutingFailed {
                task_id: &task_id,
                capability: &capability,
            }
            .log();
            self.complete(TaskResult::failure(
                task_id,
                start,
                FailureKind::Routing,
                format!(
                    "endpoint '{}' for capability '{}' is closed",
                    endpoint_id, capability
                ),
            ));
            return false;
        }

        TaskDispatched {
            task_id: &task_id,
            capability: &capability,
            endpoint_id: &endpoint_id,
        }
        .log();
        self.in_flight.insert(
            task_id,
            InFlight {
                binding: binding_id,
                start,
                orphaned: false,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ValidationError;
    use serde_json::json;

    fn shell(id: &str) -> SubTask {
        SubTask::new(id, "shell", json!({"command": "echo hi"}))
    }

    fn bound(dispatcher: &mut Dispatcher, capability: &str) -> (BindingId, mpsc::UnboundedReceiver<Task>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let binding = dispatcher.bind(capability, format!("{capability}-endpoint"), tx);
        (binding, rx)
    }

    fn failure_kind(dispatcher: &Dispatcher, id: &str) -> Option<FailureKind> {
        dispatcher.status(id).and_then(|r| r.error()).map(|e| e.kind)
    }

    #[test]
    fn unbound_capability_fails_without_reaching_a_worker() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_, mut other_rx) = bound(&mut dispatcher, "python");
        let mut feed = dispatcher.subscribe();

        dispatcher.enqueue(shell("t1"));

        assert_eq!(failure_kind(&dispatcher, "t1"), Some(FailureKind::Routing));
        assert!(other_rx.try_recv().is_err());
        assert_eq!(feed.try_recv().unwrap().id, "t1");
        assert_eq!(dispatcher.in_flight_len(), 0);
    }

    #[test]
    fn bound_capability_receives_the_task_and_result_is_recorded() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher.enqueue(shell("t1"));
        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.params, json!({"command": "echo hi"}));
        assert_eq!(dispatcher.in_flight_len(), 1);
        assert!(dispatcher.status("t1").is_none());

        assert!(dispatcher.accept_result(binding, TaskResult::success("t1", Utc::now(), json!("hi"))));
        assert_eq!(dispatcher.status("t1").and_then(|r| r.data()), Some(&json!("hi")));
        assert_eq!(dispatcher.in_flight_len(), 0);
    }

    #[test]
    fn rebinding_replaces_routing_and_orphans_in_flight_work() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (first, mut first_rx) = bound(&mut dispatcher, "shell");
        dispatcher.enqueue(shell("before"));
        assert!(first_rx.try_recv().is_ok());

        let (second, mut second_rx) = bound(&mut dispatcher, "shell");
        assert_ne!(first, second);
        assert_eq!(dispatcher.take_orphaned(), vec!["before".to_string()]);

        dispatcher.enqueue(shell("after"));
        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().unwrap().id, "after");

        let bindings = dispatcher.capabilities();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].binding, second);

        // late answer from the replaced endpoint
        assert!(!dispatcher.accept_result(first, TaskResult::success("before", Utc::now(), json!(1))));
        assert!(dispatcher.status("before").is_none());
    }

    #[test]
    fn default_cycle_drains_every_ready_task() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher
            .submit(vec![shell("a"), shell("b"), shell("c")])
            .unwrap();

        let ids: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok()).map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn dispatch_limit_paces_one_task_per_event() {
        let options = DispatchOptions {
            max_dispatch_per_event: Some(1),
            ..DispatchOptions::default()
        };
        let mut dispatcher = Dispatcher::new(options);
        let (binding, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher.submit(vec![shell("a"), shell("b")]).unwrap();
        assert_eq!(rx.try_recv().unwrap().id, "a");
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.queue_len(), 1);

        dispatcher.accept_result(binding, TaskResult::success("a", Utc::now(), json!(null)));
        assert_eq!(rx.try_recv().unwrap().id, "b");
        assert!(dispatcher.queue_is_empty());
    }

    #[test]
    fn paced_cycle_does_not_spend_its_budget_on_routing_failures() {
        let options = DispatchOptions {
            max_dispatch_per_event: Some(1),
            ..DispatchOptions::default()
        };
        let mut dispatcher = Dispatcher::new(options);

        dispatcher
            .submit(vec![
                SubTask::new("a", "nobody", json!(null)),
                SubTask::new("b", "nobody", json!(null)),
            ])
            .unwrap();

        assert_eq!(failure_kind(&dispatcher, "a"), Some(FailureKind::Routing));
        assert_eq!(failure_kind(&dispatcher, "b"), Some(FailureKind::Routing));
        assert!(dispatcher.queue_is_empty());
    }

    #[test]
    fn paced_cycle_sends_the_dependent_of_a_routing_failure() {
        let options = DispatchOptions {
            max_dispatch_per_event: Some(1),
            ..DispatchOptions::default()
        };
        let mut dispatcher = Dispatcher::new(options);
        let (_, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher
            .submit(vec![
                SubTask::new("lost", "nobody", json!(null)),
                shell("after").depends_on(["lost"]),
                shell("later"),
            ])
            .unwrap();

        assert_eq!(failure_kind(&dispatcher, "lost"), Some(FailureKind::Routing));
        assert_eq!(rx.try_recv().unwrap().id, "after");
        // the one send allowed this event went to "after"
        assert!(rx.try_recv().is_err());
        assert_eq!(dispatcher.queue_len(), 1);
    }

    #[test]
    fn dependent_waits_and_sees_resolved_params() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, mut rx) = bound(&mut dispatcher, "shell");

        let t2 = SubTask::resolved_by("t2", "shell", vec!["t1".to_string()], |results| {
            let greeting = results[0].data().and_then(|d| d.as_str()).unwrap_or_default();
            Ok(json!({"command": format!("echo {greeting} again")}))
        });
        dispatcher.submit(vec![shell("t1"), t2]).unwrap();

        assert_eq!(rx.try_recv().unwrap().id, "t1");
        assert!(rx.try_recv().is_err());

        dispatcher.accept_result(binding, TaskResult::success("t1", Utc::now(), json!("hi")));
        let second = rx.try_recv().unwrap();
        assert_eq!(second.id, "t2");
        assert_eq!(second.params, json!({"command": "echo hi again"}));
    }

    #[test]
    fn failed_dependency_still_unblocks_dependents() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher
            .submit(vec![shell("a"), shell("b").depends_on(["a"])])
            .unwrap();
        rx.try_recv().unwrap();

        dispatcher.accept_result(
            binding,
            TaskResult::failure("a", Utc::now(), FailureKind::Execution, "exit 1"),
        );
        assert_eq!(rx.try_recv().unwrap().id, "b");
    }

    #[test]
    fn resolver_error_fails_the_task_without_sending_it() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_, mut rx) = bound(&mut dispatcher, "shell");

        dispatcher.enqueue(SubTask::resolved_by("bad", "shell", Vec::new(), |_| {
            Err(crate::errors::ExecutionError::resolver("bad", "no input"))
        }));

        assert!(rx.try_recv().is_err());
        assert_eq!(failure_kind(&dispatcher, "bad"), Some(FailureKind::Execution));
    }

    #[test]
    fn duplicate_result_is_dropped() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, _rx) = bound(&mut dispatcher, "shell");
        dispatcher.enqueue(shell("t1"));
        let mut feed = dispatcher.subscribe();

        assert!(dispatcher.accept_result(binding, TaskResult::success("t1", Utc::now(), json!(1))));
        assert!(!dispatcher.accept_result(binding, TaskResult::success("t1", Utc::now(), json!(2))));

        assert_eq!(dispatcher.status("t1").and_then(|r| r.data()), Some(&json!(1)));
        assert!(feed.try_recv().is_ok());
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn closed_endpoint_is_unbound_and_task_fails_routing() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_, rx) = bound(&mut dispatcher, "shell");
        drop(rx);

        dispatcher.enqueue(shell("t1"));

        assert_eq!(failure_kind(&dispatcher, "t1"), Some(FailureKind::Routing));
        assert!(dispatcher.capabilities().is_empty());
    }

    #[test]
    fn unbind_with_stale_binding_leaves_newer_one_alone() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (first, _first_rx) = bound(&mut dispatcher, "shell");
        let (second, _second_rx) = bound(&mut dispatcher, "shell");

        assert!(!dispatcher.unbind("shell", Some(first)));
        assert_eq!(dispatcher.capabilities()[0].binding, second);

        assert!(dispatcher.unbind("shell", Some(second)));
        assert!(dispatcher.capabilities().is_empty());
        assert!(!dispatcher.unbind("shell", None));
    }

    #[test]
    fn orphan_deadline_fails_only_unanswered_orphans() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, mut rx) = bound(&mut dispatcher, "shell");
        dispatcher.submit(vec![shell("x"), shell("y")]).unwrap();
        rx.try_recv().unwrap();
        rx.try_recv().unwrap();

        dispatcher.accept_result(binding, TaskResult::success("x", Utc::now(), json!(null)));
        dispatcher.unbind("shell", None);
        let orphaned = dispatcher.take_orphaned();
        assert_eq!(orphaned, vec!["y".to_string()]);
        assert!(dispatcher.take_orphaned().is_empty());

        let expired = dispatcher.expire_orphans(
            &["x".to_string(), "y".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(expired, 1);
        assert!(dispatcher.status("x").unwrap().is_success());
        assert_eq!(failure_kind(&dispatcher, "y"), Some(FailureKind::Orphaned));
    }

    #[test]
    fn invalid_submission_queues_nothing() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_, mut rx) = bound(&mut dispatcher, "shell");

        let err = dispatcher
            .submit(vec![shell("a").depends_on(["b"]), shell("b").depends_on(["a"])])
            .unwrap_err();

        match err {
            SubmissionError::Invalid { errors } => {
                assert!(matches!(errors[0], ValidationError::CyclicDependency { .. }))
            }
            other => panic!("expected invalid submission, got {other:?}"),
        }
        assert!(dispatcher.queue_is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn resubmitting_a_known_id_is_rejected() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        dispatcher.enqueue(shell("t1"));

        assert!(dispatcher.submit(vec![shell("t1")]).is_err());
        assert!(dispatcher.submit(vec![shell("t2").depends_on(["t1"])]).is_ok());
    }

    #[test]
    fn waiters_get_existing_and_future_results() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (binding, _rx) = bound(&mut dispatcher, "shell");
        dispatcher.enqueue(shell("t1"));

        let (tx, mut early) = oneshot::channel();
        dispatcher.wait_for("t1", tx);
        assert!(early.try_recv().is_err());

        dispatcher.accept_result(binding, TaskResult::success("t1", Utc::now(), json!(1)));
        assert_eq!(early.try_recv().unwrap().id, "t1");

        let (tx, mut late) = oneshot::channel();
        dispatcher.wait_for("t1", tx);
        assert_eq!(late.try_recv().unwrap().id, "t1");
    }

    #[test]
    fn abandoned_waiters_are_pruned() {
        let mut dispatcher = Dispatcher::new(DispatchOptions::default());
        let (_binding, _rx) = bound(&mut dispatcher, "shell");
        dispatcher.enqueue(shell("t1"));

        let (gone, gave_up) = oneshot::channel();
        dispatcher.wait_for("t1", gone);
        drop(gave_up);

        let (tx, _still_waiting) = oneshot::channel();
        dispatcher.wait_for("t1", tx);
        assert_eq!(dispatcher.waiters["t1"].len(), 1);
    }
}
