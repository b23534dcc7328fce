// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use serde_json::Value;

use super::plan::SubTask;
use super::task::TaskId;
use crate::errors::SubmissionError;

/// An externally submitted task as it arrives at the boundary, before any
/// field is known to be present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub id: Option<String>,
    pub executor: Option<String>,
    pub params: Option<Value>,
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
}

impl TaskSubmission {
    /// Checks that `id`, `executor` and `params` are all present (and the
    /// strings non-empty) and converts into a schedulable subtask.
    pub fn into_subtask(self) -> Result<SubTask, SubmissionError> {
        let id = require_text(self.id, "id")?;
        let executor = require_text(self.executor, "executor")?;
        let params = self
            .params
            .ok_or(SubmissionError::MissingField { field: "params" })?;

        Ok(SubTask::new(id, executor, params).depends_on(self.dependencies))
    }
}

fn require_text(value: Option<String>, field: &'static str) -> Result<String, SubmissionError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(SubmissionError::MissingField { field }),
    }
}
