// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

use crate::errors::ExecutionError;
use crate::model::{Plan, Task};
use crate::traits::{Capability, Execution};

/// Returns the task's params as its data.
pub struct EchoCapability;

#[async_trait::async_trait]
impl Capability for EchoCapability {
    async fn execute(&self, task: Task) -> Result<Execution, ExecutionError> {
        Ok(Execution::Value(task.params))
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

/// Echoes after a fixed delay, for ordering tests.
pub struct DelayedEchoCapability {
    pub delay: Duration,
}

#[async_trait::async_trait]
impl Capability for DelayedEchoCapability {
    async fn execute(&self, task: Task) -> Result<Execution, ExecutionError> {
        tokio::time::sleep(self.delay).await;
        Ok(Execution::Value(task.params))
    }

    fn name(&self) -> &'static str {
        "delayed_echo"
    }
}

/// A capability that always fails for testing failure scenarios
pub struct FailingCapability;

#[async_trait::async_trait]
impl Capability for FailingCapability {
    async fn execute(&self, _task: Task) -> Result<Execution, ExecutionError> {
        Err(ExecutionError::capability("failing", "simulated failure"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Answers every task with the plan built by its closure.
pub struct PlanningCapability {
    build: Box<dyn Fn(&Task) -> Plan + Send + Sync>,
}

impl PlanningCapability {
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&Task) -> Plan + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
        }
    }
}

#[async_trait::async_trait]
impl Capability for PlanningCapability {
    async fn execute(&self, task: Task) -> Result<Execution, ExecutionError> {
        Ok(Execution::Plan((self.build)(&task)))
    }

    fn name(&self) -> &'static str {
        "planning"
    }
}
