// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use super::CapabilityRegistry;
use crate::engine::PlanRunner;
use crate::model::{FailureKind, Task, TaskResult};
use crate::traits::{Execution, TaskExecutor};

/// Runs tasks in-process against a [`CapabilityRegistry`].
///
/// A capability that answers with a plan has that plan driven to completion
/// before the task reports back; its subtasks go through the plan executor
/// (the scheduler, for a worker bound to one) or, by default, through this
/// executor again.
#[derive(Clone)]
pub struct LocalExecutor {
    registry: Arc<CapabilityRegistry>,
    plan_executor: Option<Arc<dyn TaskExecutor>>,
}

impl LocalExecutor {
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            plan_executor: None,
        }
    }

    /// Routes subtasks of plans through `executor` instead of locally.
    pub fn with_plan_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.plan_executor = Some(executor);
        self
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    fn plan_executor(&self) -> Arc<dyn TaskExecutor> {
        match &self.plan_executor {
            Some(executor) => Arc::clone(executor),
            None => Arc::new(self.clone()),
        }
    }
}

#[async_trait]
impl TaskExecutor for LocalExecutor {
    async fn execute(&self, task: Task) -> TaskResult {
        let start = Utc::now();
        let Some(capability) = self.registry.get(&task.executor).cloned() else {
            return TaskResult::failure(
                task.id,
                start,
                FailureKind::Routing,
                format!("no capability registered for '{}'", task.executor),
            );
        };

        let task_id = task.id.clone();
        match capability.execute(task).await {
            Ok(Execution::Value(data)) => TaskResult::success(task_id, start, data),
            Ok(Execution::Plan(plan)) => {
                let report = PlanRunner::new(self.plan_executor()).run(plan).await;
                TaskResult::success(task_id, start, report.summary())
            }
            Err(e) => {
                tracing::debug!(
                    task_id = %task_id,
                    capability = capability.name(),
                    error = %e,
                    "capability failed"
                );
                TaskResult::failure(task_id, start, FailureKind::Execution, e.to_string())
            }
        }
    }

    async fn recorded_result(&self, task_id: &str) -> Option<TaskResult> {
        match &self.plan_executor {
            Some(executor) => executor.recorded_result(task_id).await,
            None => None,
        }
    }
}
