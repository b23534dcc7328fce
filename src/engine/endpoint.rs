// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::sync::mpsc;

use crate::model::{CapabilityKey, Task, TaskResult};

/// Identifies one binding of an endpoint to a capability key. A key that is
/// rebound gets a new id, so stale unregistrations can be told apart.
pub type BindingId = u64;

/// The scheduler's side of a capability endpoint: tasks go out on `tasks`,
/// results come back on `results`.
#[derive(Debug)]
pub struct Endpoint {
    pub id: String,
    pub capability: CapabilityKey,
    pub tasks: mpsc::UnboundedSender<Task>,
    pub results: mpsc::UnboundedReceiver<TaskResult>,
}

/// The worker's side of an [`Endpoint`].
#[derive(Debug)]
pub struct WorkerChannel {
    pub tasks: mpsc::UnboundedReceiver<Task>,
    pub results: mpsc::UnboundedSender<TaskResult>,
}

/// Creates a connected endpoint and worker channel.
pub fn endpoint_pair(
    id: impl Into<String>,
    capability: impl Into<CapabilityKey>,
) -> (Endpoint, WorkerChannel) {
    let (task_tx, task_rx) = mpsc::unbounded_channel();
    let (result_tx, result_rx) = mpsc::unbounded_channel();

    let endpoint = Endpoint {
        id: id.into(),
        capability: capability.into(),
        tasks: task_tx,
        results: result_rx,
    };
    let worker = WorkerChannel {
        tasks: task_rx,
        results: result_tx,
    };
    (endpoint, worker)
}
