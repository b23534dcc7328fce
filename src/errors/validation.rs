// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use thiserror::Error;

/// Structural problems in a submitted task graph.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The submitted tasks depend on each other in a circle
    CyclicDependency {
        /// The cycle path, first id repeated at the end
        cycle: Vec<String>,
    },
    /// A task depends on an id that is neither known nor part of the submission
    UnresolvedDependency {
        task_id: String,
        missing_dependency: String,
    },
    /// The id is already known to the scheduler or repeated in the submission
    DuplicateTaskId { task_id: String },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedDependency {
                task_id,
                missing_dependency,
            } => {
                write!(
                    f,
                    "Task '{}' depends on '{}' which does not exist",
                    task_id, missing_dependency
                )
            }
            ValidationError::DuplicateTaskId { task_id } => {
                write!(f, "Duplicate task ID: '{}'", task_id)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Why a submission was rejected before it reached the queue.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("submission is missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("submission rejected: {}", join_errors(.errors))]
    Invalid { errors: Vec<ValidationError> },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
