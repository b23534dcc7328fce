// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backends::local::{CapabilityRegistry, LocalExecutor};
use crate::backends::stub::EchoCapability;
use crate::engine::{DispatchOptions, Scheduler, SchedulerHandle};
use crate::errors::TransportError;
use crate::model::{FailureKind, SubTask};
use crate::transport::{ConnectionManager, WorkerClient};

struct Server {
    scheduler: SchedulerHandle,
    manager: ConnectionManager,
    address: SocketAddr,
    shutdown: CancellationToken,
    running: JoinHandle<()>,
}

impl Server {
    async fn start() -> Self {
        let shutdown = CancellationToken::new();
        let (scheduler, running) =
            Scheduler::start_with_shutdown(DispatchOptions::default(), shutdown.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let manager = ConnectionManager::new(scheduler.clone());
        {
            let manager = manager.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { manager.serve(listener, shutdown).await });
        }
        Self {
            scheduler,
            manager,
            address,
            shutdown,
            running,
        }
    }

    async fn wait_for_binding(&self, capability: &str, endpoint_id: Option<&str>) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let bindings = self.scheduler.capabilities().await.unwrap();
                let current = bindings
                    .iter()
                    .find(|b| b.capability == capability)
                    .map(|b| b.endpoint_id.as_str());
                if current == endpoint_id {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("binding never reached the expected state");
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.running.await.unwrap();
    }
}

fn echo_worker(id: &str) -> WorkerClient {
    let registry = CapabilityRegistry::new().with("echo", Arc::new(EchoCapability));
    WorkerClient::new("echo", LocalExecutor::new(registry)).with_id(id)
}

#[tokio::test]
async fn remote_worker_executes_scheduled_tasks() {
    let server = Server::start().await;
    let worker_shutdown = CancellationToken::new();
    let worker = tokio::spawn(
        echo_worker("remote-echo").connect(server.address, worker_shutdown.clone()),
    );
    server.wait_for_binding("echo", Some("remote-echo")).await;

    let workers = server.manager.connected_workers().await;
    assert_eq!(workers.len(), 1);
    assert_eq!(workers[0].worker_id.as_deref(), Some("remote-echo"));

    let first = SubTask::new("t1", "echo", json!({"command": "echo hi"}));
    let second = SubTask::resolved_by("t2", "echo", vec!["t1".into()], |results| {
        Ok(json!({"previous": results[0].data().cloned()}))
    });
    server.scheduler.submit_batch(vec![first]).await.unwrap();
    let result = tokio::time::timeout(Duration::from_secs(5), server.scheduler.execute(second))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        result.data(),
        Some(&json!({"previous": {"command": "echo hi"}}))
    );

    worker_shutdown.cancel();
    worker.await.unwrap().unwrap();
    server.wait_for_binding("echo", None).await;

    let after = server
        .scheduler
        .execute(SubTask::new("t3", "echo", json!(null)))
        .await
        .unwrap();
    assert_eq!(after.error().map(|e| e.kind), Some(FailureKind::Routing));

    server.stop().await;
}

#[tokio::test]
async fn later_registration_takes_over_the_capability() {
    let server = Server::start().await;

    let first = tokio::spawn(echo_worker("first").connect(server.address, CancellationToken::new()));
    server.wait_for_binding("echo", Some("first")).await;

    let second_shutdown = CancellationToken::new();
    let second = tokio::spawn(echo_worker("second").connect(server.address, second_shutdown.clone()));
    server.wait_for_binding("echo", Some("second")).await;

    let err = tokio::time::timeout(Duration::from_secs(5), first)
        .await
        .unwrap()
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, TransportError::Rejected(_)));

    // the first connection's teardown must not unbind the second worker
    let result = server
        .scheduler
        .execute(SubTask::new("t1", "echo", json!("still routed")))
        .await
        .unwrap();
    assert_eq!(result.data(), Some(&json!("still routed")));

    second_shutdown.cancel();
    second.await.unwrap().unwrap();
    server.stop().await;
}
