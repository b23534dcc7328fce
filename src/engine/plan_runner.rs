// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Drives a [`Plan`] to completion.
//!
//! # Algorithm
//!
//! Every (nested) plan stream is merged into one [`SelectAll`], each followed
//! by a `Closed` marker so the runner sees exactly when a producer is done.
//! An open-subscription counter goes up when a plan is attached and down on
//! its marker.
//!
//! Subtasks go into a ready queue scoped to this run. Whenever something
//! happens (an item arrives, an execution finishes) the queue is drained:
//! each ready subtask has its params resolved from the run's result map and
//! is launched through the [`TaskExecutor`]. Executions run concurrently and
//! their results go back into the map, unblocking dependents.
//!
//! A dependency this run has never seen may already have a result recorded
//! elsewhere, for example a top-level task the scheduler ran earlier. The
//! executor is asked for it ([`TaskExecutor::recorded_result`]); a hit counts
//! as completed and feeds resolvers, but is not part of the report.
//!
//! The run ends when no subscription is open, nothing is executing and the
//! queue is empty. If the streams have all ended with subtasks still parked
//! and none of their missing dependencies has a result anywhere, nothing can
//! ever unblock them, so they fail with [`FailureKind::Unsatisfiable`].
//!
//! Problems are scoped to the subtask they belong to: a failing resolver or
//! capability yields a failure result for that id and the run carries on.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, FuturesUnordered, SelectAll, StreamExt};
use serde_json::{json, Value};

use crate::engine::ready_queue::ReadyQueue;
use crate::model::{FailureKind, Plan, PlanItem, SubTask, TaskId, TaskResult};
use crate::observability::messages::plan::{
    NestedPlanAttached, PlanCompleted, PlanStarted, SubtaskFailed, UnsatisfiableSubtasks,
};
use crate::observability::messages::StructuredLog;
use crate::traits::TaskExecutor;

/// Results of every subtask a plan (and its nested plans) produced.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub plan_id: TaskId,
    pub results: HashMap<TaskId, TaskResult>,
}

impl PlanReport {
    pub fn subtask_count(&self) -> usize {
        self.results.len()
    }

    pub fn failed_count(&self) -> usize {
        self.results.values().filter(|r| !r.is_success()).count()
    }

    pub fn result(&self, task_id: &str) -> Option<&TaskResult> {
        self.results.get(task_id)
    }

    /// Data reported as the originating task's own result.
    pub fn summary(&self) -> Value {
        json!({
            "planId": self.plan_id,
            "status": "plan executed",
            "subtasks": self.subtask_count(),
            "failed": self.failed_count(),
        })
    }
}

enum StreamEvent {
    Item { plan_id: TaskId, item: PlanItem },
    Closed,
}

pub struct PlanRunner {
    executor: Arc<dyn TaskExecutor>,
}

impl PlanRunner {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self { executor }
    }

    pub async fn run(&self, plan: Plan) -> PlanReport {
        let started = Instant::now();
        let root_id = plan.id().to_string();
        PlanStarted { plan_id: &root_id }.log();

        let mut run = PlanRun {
            root_id: root_id.clone(),
            streams: SelectAll::new(),
            open_subscriptions: 0,
            queue: ReadyQueue::new(),
            results: HashMap::new(),
            upstream: HashSet::new(),
            running: FuturesUnordered::new(),
        };
        run.attach(plan);

        loop {
            run.launch_ready(&self.executor);

            if run.open_subscriptions == 0 && run.running.is_empty() {
                if !run.queue.is_empty() {
                    let missing: Vec<TaskId> = run
                        .queue
                        .pending()
                        .flat_map(|subtask| subtask.dependencies.iter().cloned())
                        .collect();
                    if run.import_upstream(&self.executor, &missing).await {
                        continue;
                    }
                    run.fail_unsatisfiable();
                }
                break;
            }

            tokio::select! {
                Some(event) = run.streams.next(), if run.open_subscriptions > 0 => {
                    if let Some(subtask) = run.handle_event(event) {
                        run.import_upstream(&self.executor, &subtask.dependencies).await;
                        run.queue.enqueue(subtask);
                    }
                }
                Some(result) = run.running.next(), if !run.running.is_empty() => {
                    run.record(result);
                }
                else => break,
            }
        }

        let PlanRun {
            mut results,
            upstream,
            ..
        } = run;
        results.retain(|task_id, _| !upstream.contains(task_id));
        let report = PlanReport {
            plan_id: root_id,
            results,
        };
        PlanCompleted {
            plan_id: &report.plan_id,
            subtasks: report.subtask_count(),
            failed: report.failed_count(),
            duration: started.elapsed(),
        }
        .log();
        report
    }
}

struct PlanRun {
    root_id: TaskId,
    streams: SelectAll<BoxStream<'static, StreamEvent>>,
    open_subscriptions: usize,
    queue: ReadyQueue<SubTask>,
    results: HashMap<TaskId, TaskResult>,
    /// Ids in `results` that were recorded outside this run.
    upstream: HashSet<TaskId>,
    running: FuturesUnordered<BoxFuture<'static, TaskResult>>,
}

impl PlanRun {
    fn attach(&mut self, plan: Plan) {
        let plan_id = plan.id().to_string();
        let items = plan
            .into_stream()
            .map(move |item| StreamEvent::Item {
                plan_id: plan_id.clone(),
                item,
            })
            .chain(stream::once(async { StreamEvent::Closed }));
        self.streams.push(items.boxed());
        self.open_subscriptions += 1;
    }

    /// Returns a newly emitted subtask for the caller to queue.
    fn handle_event(&mut self, event: StreamEvent) -> Option<SubTask> {
        match event {
            StreamEvent::Closed => {
                self.open_subscriptions -= 1;
                None
            }
            StreamEvent::Item {
                plan_id,
                item: PlanItem::Plan(nested),
            } => {
                let nested_id = nested.id().to_string();
                self.attach(nested);
                NestedPlanAttached {
                    plan_id: &plan_id,
                    nested_plan_id: &nested_id,
                    open_subscriptions: self.open_subscriptions,
                }
                .log();
                None
            }
            StreamEvent::Item {
                plan_id,
                item: PlanItem::SubTask(mut subtask),
            } => {
                if self.is_known(&subtask.id) {
                    tracing::warn!(
                        plan_id = %plan_id,
                        task_id = %subtask.id,
                        "ignoring subtask with an id already used in this plan"
                    );
                    return None;
                }
                if subtask.plan_id.is_none() {
                    subtask.plan_id = Some(plan_id);
                }
                Some(subtask)
            }
        }
    }

    /// Pulls in results recorded elsewhere for dependencies this run does
    /// not know. Returns whether any were found.
    async fn import_upstream(
        &mut self,
        executor: &Arc<dyn TaskExecutor>,
        dependencies: &[TaskId],
    ) -> bool {
        let mut imported = false;
        for dependency in dependencies {
            if self.is_known(dependency) {
                continue;
            }
            if let Some(result) = executor.recorded_result(dependency).await {
                self.queue.mark_completed(dependency);
                self.upstream.insert(dependency.clone());
                self.results.insert(dependency.clone(), result);
                imported = true;
            }
        }
        imported
    }

    fn launch_ready(&mut self, executor: &Arc<dyn TaskExecutor>) {
        while let Some(subtask) = self.queue.dequeue() {
            match subtask.resolve(&self.results) {
                Ok(task) => {
                    let executor = Arc::clone(executor);
                    self.running
                        .push(Box::pin(async move { executor.execute(task).await }));
                }
                Err(e) => {
                    self.record(TaskResult::failure(
                        subtask.id,
                        Utc::now(),
                        FailureKind::Execution,
                        e.to_string(),
                    ));
                }
            }
        }
    }

    fn record(&mut self, result: TaskResult) {
        if let Some(error) = result.error() {
            SubtaskFailed {
                plan_id: &self.root_id,
                task_id: &result.id,
                error: &error.message,
            }
            .log();
        }
        self.queue.mark_completed(&result.id);
        self.results.insert(result.id.clone(), result);
    }

    fn fail_unsatisfiable(&mut self) {
        let parked = self.queue.drain_pending();
        let ids: Vec<&str> = parked.iter().map(|s| s.id.as_str()).collect();
        UnsatisfiableSubtasks {
            plan_id: &self.root_id,
            task_ids: &ids,
        }
        .log();

        let now = Utc::now();
        for subtask in &parked {
            let missing: Vec<&str> = subtask
                .dependencies
                .iter()
                .filter(|d| !self.queue.is_completed(d))
                .map(String::as_str)
                .collect();
            let result = TaskResult::failure(
                subtask.id.clone(),
                now,
                FailureKind::Unsatisfiable,
                format!("dependencies never completed: {}", missing.join(", ")),
            );
            self.results.insert(result.id.clone(), result);
        }
    }

    fn is_known(&self, task_id: &str) -> bool {
        self.results.contains_key(task_id)
            || self.queue.is_in_flight(task_id)
            || self.queue.is_pending(task_id)
    }
}
