// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ExecutionError;
use crate::model::{Plan, Task};

/// What running a capability produced.
#[derive(Debug)]
pub enum Execution {
    /// The task's own data.
    Value(Value),
    /// More work discovered while running the task. The task only completes
    /// once the plan has been driven to the end.
    Plan(Plan),
}

impl From<Value> for Execution {
    fn from(value: Value) -> Self {
        Execution::Value(value)
    }
}

impl From<Plan> for Execution {
    fn from(plan: Plan) -> Self {
        Execution::Plan(plan)
    }
}

/// The concrete work behind a capability key (shell, tool call, model call..).
#[async_trait]
pub trait Capability: Send + Sync {
    async fn execute(&self, task: Task) -> Result<Execution, ExecutionError>;

    fn name(&self) -> &'static str;
}
