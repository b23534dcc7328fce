// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::task::{CapabilityKey, Task, TaskId, TaskResult};
use crate::errors::ExecutionError;

/// Derives a subtask's params from its dependencies' results, given in the
/// order the dependencies were declared.
pub type ParamsResolver =
    Arc<dyn Fn(&[TaskResult]) -> Result<Value, ExecutionError> + Send + Sync>;

/// Params of a subtask: either known up front or derived from dependencies.
#[derive(Clone)]
pub enum Params {
    Value(Value),
    Resolver(ParamsResolver),
}

impl Params {
    pub fn resolve(&self, dependency_results: &[TaskResult]) -> Result<Value, ExecutionError> {
        match self {
            Params::Value(value) => Ok(value.clone()),
            Params::Resolver(resolver) => resolver(dependency_results),
        }
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Params::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<Value> for Params {
    fn from(value: Value) -> Self {
        Params::Value(value)
    }
}

/// A task that waits on other tasks and may derive its params from them.
#[derive(Debug, Clone)]
pub struct SubTask {
    pub id: TaskId,
    pub executor: CapabilityKey,
    pub plan_id: Option<TaskId>,
    pub dependencies: Vec<TaskId>,
    pub params: Params,
}

impl SubTask {
    pub fn new(id: impl Into<TaskId>, executor: impl Into<CapabilityKey>, params: Value) -> Self {
        Self {
            id: id.into(),
            executor: executor.into(),
            plan_id: None,
            dependencies: Vec::new(),
            params: Params::Value(params),
        }
    }

    /// Subtask whose params are computed from `dependencies`' results.
    pub fn resolved_by<F>(
        id: impl Into<TaskId>,
        executor: impl Into<CapabilityKey>,
        dependencies: Vec<TaskId>,
        resolver: F,
    ) -> Self
    where
        F: Fn(&[TaskResult]) -> Result<Value, ExecutionError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            executor: executor.into(),
            plan_id: None,
            dependencies,
            params: Params::Resolver(Arc::new(resolver)),
        }
    }

    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_plan(mut self, plan_id: impl Into<TaskId>) -> Self {
        self.plan_id = Some(plan_id.into());
        self
    }

    /// Resolves params against recorded results and produces the sendable task.
    ///
    /// Every dependency must already have a recorded result.
    pub fn resolve(&self, results: &HashMap<TaskId, TaskResult>) -> Result<Task, ExecutionError> {
        let mut dependency_results = Vec::with_capacity(self.dependencies.len());
        for dependency in &self.dependencies {
            let result = results
                .get(dependency)
                .ok_or_else(|| ExecutionError::MissingDependencyResult {
                    task_id: self.id.clone(),
                    dependency: dependency.clone(),
                })?;
            dependency_results.push(result.clone());
        }

        let params = self.params.resolve(&dependency_results)?;
        Ok(Task {
            id: self.id.clone(),
            executor: self.executor.clone(),
            params,
            plan_id: self.plan_id.clone(),
        })
    }
}

impl From<Task> for SubTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            executor: task.executor,
            plan_id: task.plan_id,
            dependencies: Vec::new(),
            params: Params::Value(task.params),
        }
    }
}

/// One element of a plan's stream.
#[derive(Debug)]
pub enum PlanItem {
    SubTask(SubTask),
    Plan(Plan),
}

impl From<SubTask> for PlanItem {
    fn from(subtask: SubTask) -> Self {
        PlanItem::SubTask(subtask)
    }
}

impl From<Plan> for PlanItem {
    fn from(plan: Plan) -> Self {
        PlanItem::Plan(plan)
    }
}

/// A lazily produced, non-restartable stream of subtasks and nested plans.
///
/// The stream ending is the end-of-plan signal.
pub struct Plan {
    id: TaskId,
    items: BoxStream<'static, PlanItem>,
}

impl Plan {
    pub fn new<S>(id: impl Into<TaskId>, items: S) -> Self
    where
        S: Stream<Item = PlanItem> + Send + 'static,
    {
        Self {
            id: id.into(),
            items: items.boxed(),
        }
    }

    /// A finite plan whose items are all known up front.
    pub fn from_items<I>(id: impl Into<TaskId>, items: I) -> Self
    where
        I: IntoIterator<Item = PlanItem>,
    {
        let items: Vec<PlanItem> = items.into_iter().collect();
        Self::new(id, stream::iter(items))
    }

    /// A push-based plan. Items emitted through the returned [`PlanEmitter`]
    /// are delivered in order; dropping or finishing the emitter ends the plan.
    pub fn channel(id: impl Into<TaskId>) -> (PlanEmitter, Plan) {
        let id = id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let items = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        let emitter = PlanEmitter {
            plan_id: id.clone(),
            tx,
        };
        (emitter, Self::new(id, items))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn into_stream(self) -> BoxStream<'static, PlanItem> {
        self.items
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Producer side of [`Plan::channel`].
#[derive(Debug)]
pub struct PlanEmitter {
    plan_id: TaskId,
    tx: mpsc::UnboundedSender<PlanItem>,
}

impl PlanEmitter {
    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    /// Pushes an item; returns `false` if the plan is no longer being consumed.
    pub fn emit(&self, item: impl Into<PlanItem>) -> bool {
        self.tx.send(item.into()).is_ok()
    }

    /// Ends the plan.
    pub fn finish(self) {}
}
