// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::SubmissionError;

/// Errors returned by the scheduler handle itself (never by a task).
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("scheduler has been shut down")]
    SchedulerStopped,

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}
