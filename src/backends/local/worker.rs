// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::LocalExecutor;
use crate::engine::{endpoint_pair, BindingId, Endpoint, SchedulerHandle};
use crate::errors::DispatchError;
use crate::model::CapabilityKey;
use crate::traits::TaskExecutor;

/// An in-process endpoint: serves one capability key from a
/// [`LocalExecutor`], running each task it receives concurrently.
pub struct LocalWorker {
    id: String,
    capability: CapabilityKey,
    executor: LocalExecutor,
}

impl LocalWorker {
    pub fn new(capability: impl Into<CapabilityKey>, executor: LocalExecutor) -> Self {
        let capability = capability.into();
        Self {
            id: format!("local-{}-{}", capability, Uuid::new_v4()),
            capability,
            executor,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Starts serving. Returns the endpoint to bind and the worker loop,
    /// which ends once the endpoint is dropped.
    pub fn spawn(self) -> (Endpoint, JoinHandle<()>) {
        let (endpoint, mut channel) = endpoint_pair(self.id, self.capability);
        let executor = self.executor;

        let worker = tokio::spawn(async move {
            while let Some(task) = channel.tasks.recv().await {
                let executor = executor.clone();
                let results = channel.results.clone();
                tokio::spawn(async move {
                    let result = executor.execute(task).await;
                    // endpoint gone; nobody is waiting
                    let _ = results.send(result);
                });
            }
        });
        (endpoint, worker)
    }

    /// Starts serving and binds the endpoint on `scheduler`.
    pub async fn attach(
        self,
        scheduler: &SchedulerHandle,
    ) -> Result<(BindingId, JoinHandle<()>), DispatchError> {
        let (endpoint, worker) = self.spawn();
        match scheduler.register_endpoint(endpoint).await {
            Ok(binding) => Ok((binding, worker)),
            Err(e) => {
                worker.abort();
                Err(e)
            }
        }
    }
}
