// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The scheduler context: an event loop that owns a [`Dispatcher`] and a
//! cloneable [`SchedulerHandle`] for talking to it.
//!
//! All state lives inside the loop task. Handles send commands over a
//! channel and await replies, so every mutation happens on one task, one
//! event at a time. Each bound endpoint gets a forwarding task that feeds
//! its results back into the loop; replacing or removing the binding aborts
//! that forwarder.
//!
//! ```rust,no_run
//! use serde_json::json;
//! use the_taskwood::engine::{DispatchOptions, Scheduler};
//! use the_taskwood::model::SubTask;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (scheduler, running) = Scheduler::start(DispatchOptions::default());
//!
//! scheduler
//!     .submit_batch(vec![SubTask::new("t1", "shell", json!({"command": "echo hi"}))])
//!     .await?;
//! let result = scheduler.status("t1").await?;
//!
//! scheduler.shutdown();
//! running.await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::dispatcher::{CapabilityBinding, DispatchOptions, Dispatcher};
use crate::engine::endpoint::{BindingId, Endpoint};
use crate::errors::{DispatchError, SubmissionError};
use crate::model::{
    CapabilityKey, FailureKind, SubTask, Task, TaskId, TaskResult, TaskSubmission,
};
use crate::observability::messages::dispatch::{SchedulerStarted, SchedulerStopped};
use crate::observability::messages::StructuredLog;
use crate::traits::TaskExecutor;

enum Command {
    Submit {
        batch: Vec<SubTask>,
        reply: oneshot::Sender<Result<(), SubmissionError>>,
    },
    Execute {
        task: SubTask,
        waiter: oneshot::Sender<TaskResult>,
        reply: oneshot::Sender<Result<(), SubmissionError>>,
    },
    Enqueue {
        task: SubTask,
    },
    Status {
        task_id: TaskId,
        reply: oneshot::Sender<Option<TaskResult>>,
    },
    QueueStats {
        reply: oneshot::Sender<QueueStats>,
    },
    Capabilities {
        reply: oneshot::Sender<Vec<CapabilityBinding>>,
    },
    Register {
        endpoint: Endpoint,
        reply: oneshot::Sender<BindingId>,
    },
    Unregister {
        capability: CapabilityKey,
        binding: Option<BindingId>,
        reply: oneshot::Sender<bool>,
    },
    EndpointResult {
        binding: BindingId,
        result: TaskResult,
    },
    EndpointClosed {
        capability: CapabilityKey,
        binding: BindingId,
    },
    OrphanDeadline {
        task_ids: Vec<TaskId>,
        timeout: Duration,
    },
}

/// Snapshot of queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
}

pub struct Scheduler {
    dispatcher: Dispatcher,
    commands: mpsc::UnboundedReceiver<Command>,
    loopback: mpsc::UnboundedSender<Command>,
    forwarders: HashMap<CapabilityKey, (BindingId, JoinHandle<()>)>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Spawns the event loop and returns a handle to it plus its join handle.
    ///
    /// The loop runs until [`SchedulerHandle::shutdown`] is called.
    pub fn start(options: DispatchOptions) -> (SchedulerHandle, JoinHandle<()>) {
        Self::start_with_shutdown(options, CancellationToken::new())
    }

    /// Like [`Scheduler::start`], stopping when `shutdown` is cancelled.
    pub fn start_with_shutdown(
        options: DispatchOptions,
        shutdown: CancellationToken,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(options);

        let handle = SchedulerHandle {
            commands: tx.clone(),
            publisher: dispatcher.publisher(),
            shutdown: shutdown.clone(),
        };
        let scheduler = Scheduler {
            dispatcher,
            commands: rx,
            loopback: tx,
            forwarders: HashMap::new(),
            shutdown,
        };
        (handle, tokio::spawn(scheduler.run()))
    }

    async fn run(mut self) {
        let options = self.dispatcher.options();
        SchedulerStarted {
            max_dispatch_per_event: options.max_dispatch_per_event,
            orphan_timeout: options.orphan_timeout,
        }
        .log();

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        for (_, (_, forwarder)) in self.forwarders.drain() {
            forwarder.abort();
        }
        SchedulerStopped {
            pending: self.dispatcher.queue_len(),
            in_flight: self.dispatcher.in_flight_len(),
        }
        .log();
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Submit { batch, reply } => {
                let _ = reply.send(self.dispatcher.submit(batch));
            }
            Command::Execute {
                task,
                waiter,
                reply,
            } => {
                let task_id = task.id.clone();
                let outcome = self.dispatcher.submit(vec![task]);
                if outcome.is_ok() {
                    self.dispatcher.wait_for(&task_id, waiter);
                }
                let _ = reply.send(outcome);
            }
            Command::Enqueue { task } => self.dispatcher.enqueue(task),
            Command::Status { task_id, reply } => {
                let _ = reply.send(self.dispatcher.status(&task_id).cloned());
            }
            Command::QueueStats { reply } => {
                let _ = reply.send(QueueStats {
                    pending: self.dispatcher.queue_len(),
                    in_flight: self.dispatcher.in_flight_len(),
                });
            }
            Command::Capabilities { reply } => {
                let _ = reply.send(self.dispatcher.capabilities());
            }
            Command::Register { endpoint, reply } => {
                let _ = reply.send(self.register(endpoint));
            }
            Command::Unregister {
                capability,
                binding,
                reply,
            } => {
                let removed = self.dispatcher.unbind(&capability, binding);
                if removed {
                    self.stop_forwarder(&capability);
                }
                let _ = reply.send(removed);
            }
            Command::EndpointResult { binding, result } => {
                self.dispatcher.accept_result(binding, result);
            }
            Command::EndpointClosed {
                capability,
                binding,
            } => {
                if self.dispatcher.unbind(&capability, Some(binding)) {
                    self.forwarders.remove(&capability);
                }
            }
            Command::OrphanDeadline { task_ids, timeout } => {
                self.dispatcher.expire_orphans(&task_ids, timeout);
            }
        }

        self.schedule_orphan_deadline();
    }

    fn register(&mut self, endpoint: Endpoint) -> BindingId {
        let Endpoint {
            id,
            capability,
            tasks,
            mut results,
        } = endpoint;

        self.stop_forwarder(&capability);
        let binding = self.dispatcher.bind(capability.clone(), id, tasks);

        let loopback = self.loopback.clone();
        let key = capability.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(result) = results.recv().await {
                if loopback
                    .send(Command::EndpointResult { binding, result })
                    .is_err()
                {
                    return;
                }
            }
            let _ = loopback.send(Command::EndpointClosed {
                capability: key,
                binding,
            });
        });
        self.forwarders.insert(capability, (binding, forwarder));
        binding
    }

    fn stop_forwarder(&mut self, capability: &str) {
        if let Some((_, forwarder)) = self.forwarders.remove(capability) {
            forwarder.abort();
        }
    }

    fn schedule_orphan_deadline(&mut self) {
        let orphaned = self.dispatcher.take_orphaned();
        if orphaned.is_empty() {
            return;
        }
        let Some(timeout) = self.dispatcher.options().orphan_timeout else {
            return;
        };

        let loopback = self.loopback.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    let _ = loopback.send(Command::OrphanDeadline {
                        task_ids: orphaned,
                        timeout,
                    });
                }
            }
        });
    }
}

/// Cheap, cloneable access to a running scheduler.
///
/// Every call fails with [`DispatchError::SchedulerStopped`] once the
/// scheduler has shut down.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    publisher: broadcast::Sender<TaskResult>,
    shutdown: CancellationToken,
}

impl SchedulerHandle {
    /// Validates a boundary submission and queues it.
    pub async fn submit(&self, submission: TaskSubmission) -> Result<(), DispatchError> {
        let subtask = submission.into_subtask()?;
        self.submit_batch(vec![subtask]).await
    }

    /// Validates a batch as a whole and queues it. Nothing is queued if any
    /// task is rejected.
    pub async fn submit_batch(&self, batch: Vec<SubTask>) -> Result<(), DispatchError> {
        self.request(|reply| Command::Submit { batch, reply })
            .await?
            .map_err(DispatchError::from)
    }

    /// Submits one task and waits for its result.
    pub async fn execute(&self, task: SubTask) -> Result<TaskResult, DispatchError> {
        let (waiter, result) = oneshot::channel();
        self.request(|reply| Command::Execute {
            task,
            waiter,
            reply,
        })
        .await??;
        result.await.map_err(|_| DispatchError::SchedulerStopped)
    }

    /// Queues a task without validation.
    pub fn enqueue(&self, task: SubTask) -> Result<(), DispatchError> {
        self.send(Command::Enqueue { task })
    }

    /// The recorded result for `task_id`, if it has one yet.
    pub async fn status(&self, task_id: &str) -> Result<Option<TaskResult>, DispatchError> {
        let task_id = task_id.to_string();
        self.request(|reply| Command::Status { task_id, reply }).await
    }

    pub async fn queue_stats(&self) -> Result<QueueStats, DispatchError> {
        self.request(|reply| Command::QueueStats { reply }).await
    }

    pub async fn queue_len(&self) -> Result<usize, DispatchError> {
        Ok(self.queue_stats().await?.pending)
    }

    pub async fn queue_is_empty(&self) -> Result<bool, DispatchError> {
        Ok(self.queue_stats().await?.pending == 0)
    }

    pub async fn capabilities(&self) -> Result<Vec<CapabilityBinding>, DispatchError> {
        self.request(|reply| Command::Capabilities { reply }).await
    }

    /// Binds `endpoint` to its capability key, replacing any earlier binding.
    pub async fn register_endpoint(&self, endpoint: Endpoint) -> Result<BindingId, DispatchError> {
        self.request(|reply| Command::Register { endpoint, reply })
            .await
    }

    /// Unbinds `capability`. With `Some(binding)` it only unbinds if that
    /// binding is still current. Returns whether anything was removed.
    pub async fn unregister_endpoint(
        &self,
        capability: &str,
        binding: Option<BindingId>,
    ) -> Result<bool, DispatchError> {
        let capability = capability.to_string();
        self.request(|reply| Command::Unregister {
            capability,
            binding,
            reply,
        })
        .await
    }

    /// Every result recorded from now on.
    pub fn subscribe(&self) -> Result<broadcast::Receiver<TaskResult>, DispatchError> {
        if self.is_stopped() {
            return Err(DispatchError::SchedulerStopped);
        }
        Ok(self.publisher.subscribe())
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn send(&self, command: Command) -> Result<(), DispatchError> {
        if self.is_stopped() {
            return Err(DispatchError::SchedulerStopped);
        }
        self.commands
            .send(command)
            .map_err(|_| DispatchError::SchedulerStopped)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, DispatchError> {
        let (reply, response) = oneshot::channel();
        self.send(command(reply))?;
        response.await.map_err(|_| DispatchError::SchedulerStopped)
    }
}

#[async_trait]
impl TaskExecutor for SchedulerHandle {
    async fn execute(&self, task: Task) -> TaskResult {
        let start = Utc::now();
        let task_id = task.id.clone();
        match SchedulerHandle::execute(self, SubTask::from(task)).await {
            Ok(result) => result,
            Err(e) => TaskResult::failure(task_id, start, FailureKind::Execution, e.to_string()),
        }
    }

    async fn recorded_result(&self, task_id: &str) -> Option<TaskResult> {
        self.status(task_id).await.ok().flatten()
    }
}
