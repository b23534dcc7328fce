// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use crate::backends::local::{CapabilityRegistry, LocalExecutor, LocalWorker};
use crate::backends::stub::{DelayedEchoCapability, EchoCapability, PlanningCapability};
use crate::engine::{endpoint_pair, DispatchOptions, PlanRunner, Scheduler, SchedulerHandle};
use crate::model::{FailureKind, Plan, SubTask, TaskResult, TaskSubmission};
use crate::traits::TaskExecutor;

async fn wait_for_status(scheduler: &SchedulerHandle, task_id: &str) -> TaskResult {
    let mut feed = scheduler.subscribe().unwrap();
    if let Some(result) = scheduler.status(task_id).await.unwrap() {
        return result;
    }
    loop {
        let result = tokio::time::timeout(Duration::from_secs(5), feed.recv())
            .await
            .expect("timed out waiting for a result")
            .unwrap();
        if result.id == task_id {
            return result;
        }
    }
}

#[tokio::test]
async fn unbound_capability_status_is_a_failure() {
    let (scheduler, running) = Scheduler::start(DispatchOptions::default());

    scheduler
        .submit(TaskSubmission {
            id: Some("t1".into()),
            executor: Some("shell".into()),
            params: Some(json!({"command": "echo hi"})),
            dependencies: Vec::new(),
        })
        .await
        .unwrap();

    let result = wait_for_status(&scheduler, "t1").await;
    assert!(!result.is_success());
    assert_eq!(result.error().map(|e| e.kind), Some(FailureKind::Routing));

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn dependent_is_dispatched_with_params_from_the_first_result() {
    let (scheduler, running) = Scheduler::start(DispatchOptions::default());
    let (endpoint, mut shell) = endpoint_pair("shell-worker", "shell");
    scheduler.register_endpoint(endpoint).await.unwrap();

    let t1 = SubTask::new("t1", "shell", json!({"command": "echo hi"}));
    let t2 = SubTask::resolved_by("t2", "shell", vec!["t1".into()], |results| {
        let output = results[0].data().and_then(|d| d.as_str()).unwrap_or_default();
        Ok(json!({"command": format!("echo {output} | wc -c")}))
    });
    scheduler.submit_batch(vec![t1, t2]).await.unwrap();

    let first = shell.tasks.recv().await.unwrap();
    assert_eq!(first.id, "t1");
    assert!(shell.tasks.try_recv().is_err());

    shell
        .results
        .send(TaskResult::success("t1", Utc::now(), json!("hi")))
        .unwrap();

    let second = tokio::time::timeout(Duration::from_secs(5), shell.tasks.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.id, "t2");
    assert_eq!(second.params, json!({"command": "echo hi | wc -c"}));

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn plan_task_completes_after_all_of_its_subtasks() {
    let (scheduler, running) = Scheduler::start(DispatchOptions::default());

    let echo_registry = CapabilityRegistry::new().with(
        "echo",
        Arc::new(DelayedEchoCapability {
            delay: Duration::from_millis(20),
        }),
    );
    LocalWorker::new("echo", LocalExecutor::new(echo_registry))
        .attach(&scheduler)
        .await
        .unwrap();

    let planner_registry = CapabilityRegistry::new().with(
        "planner",
        Arc::new(PlanningCapability::new(|task| {
            Plan::from_items(
                task.id.clone(),
                vec![
                    SubTask::new("x", "echo", json!("x-data")).into(),
                    SubTask::resolved_by("y", "echo", vec!["x".into()], |results| {
                        Ok(json!({"from": results[0].data().cloned()}))
                    })
                    .into(),
                ],
            )
        })),
    );
    let planner_executor = LocalExecutor::new(planner_registry)
        .with_plan_executor(Arc::new(scheduler.clone()));
    LocalWorker::new("planner", planner_executor)
        .attach(&scheduler)
        .await
        .unwrap();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        scheduler.execute(SubTask::new("plan-1", "planner", json!(null))),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(result.data().unwrap()["subtasks"], 2);
    assert_eq!(result.data().unwrap()["failed"], 0);

    let x = scheduler.status("x").await.unwrap().unwrap();
    let y = scheduler.status("y").await.unwrap().unwrap();
    assert!(x.end <= y.start);
    assert!(y.end <= result.end);
    assert_eq!(y.data(), Some(&json!({"from": "x-data"})));

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn plan_subtask_can_depend_on_a_task_the_scheduler_already_ran() {
    let (scheduler, running) = Scheduler::start(DispatchOptions::default());
    let registry = CapabilityRegistry::new().with("echo", Arc::new(EchoCapability));
    LocalWorker::new("echo", LocalExecutor::new(registry))
        .attach(&scheduler)
        .await
        .unwrap();

    let outer = scheduler
        .execute(SubTask::new("outer", "echo", json!("outer-data")))
        .await
        .unwrap();
    assert!(outer.is_success());

    let plan = Plan::from_items(
        "p",
        vec![SubTask::resolved_by("inner", "echo", vec!["outer".into()], |results| {
            Ok(json!({"from": results[0].data().cloned()}))
        })
        .into()],
    );
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        PlanRunner::new(Arc::new(scheduler.clone())).run(plan),
    )
    .await
    .unwrap();

    let inner = report.result("inner").unwrap();
    assert_eq!(inner.data(), Some(&json!({"from": "outer-data"})));
    assert_eq!(report.subtask_count(), 1);
    assert_eq!(report.failed_count(), 0);

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn paced_dispatch_moves_past_routing_failures() {
    let options = DispatchOptions {
        max_dispatch_per_event: Some(1),
        ..DispatchOptions::default()
    };
    let (scheduler, running) = Scheduler::start(options);

    scheduler
        .submit_batch(vec![
            SubTask::new("a", "nobody", json!(null)),
            SubTask::new("b", "nobody", json!(null)),
        ])
        .await
        .unwrap();

    for id in ["a", "b"] {
        let result = scheduler.status(id).await.unwrap().unwrap();
        assert_eq!(result.error().map(|e| e.kind), Some(FailureKind::Routing));
    }
    assert!(scheduler.queue_is_empty().await.unwrap());

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn scheduler_and_local_executor_agree_on_plain_tasks() {
    let (scheduler, running) = Scheduler::start(DispatchOptions::default());
    let registry = CapabilityRegistry::new().with("echo", Arc::new(EchoCapability));
    let local = LocalExecutor::new(registry.clone());
    LocalWorker::new("echo", LocalExecutor::new(registry))
        .attach(&scheduler)
        .await
        .unwrap();

    let executors: Vec<Arc<dyn TaskExecutor>> = vec![Arc::new(local), Arc::new(scheduler.clone())];
    for (n, executor) in executors.into_iter().enumerate() {
        let task = crate::model::Task::new(format!("t{n}"), "echo", json!({"n": n}));
        let result = executor.execute(task).await;
        assert_eq!(result.data(), Some(&json!({"n": n})));
    }

    scheduler.shutdown();
    running.await.unwrap();
}

#[tokio::test]
async fn paced_dispatch_still_finishes_every_task() {
    let options = DispatchOptions {
        max_dispatch_per_event: Some(1),
        ..DispatchOptions::default()
    };
    let (scheduler, running) = Scheduler::start(options);
    let registry = CapabilityRegistry::new().with("echo", Arc::new(EchoCapability));
    LocalWorker::new("echo", LocalExecutor::new(registry))
        .attach(&scheduler)
        .await
        .unwrap();

    let batch: Vec<SubTask> = (0..5)
        .map(|n| SubTask::new(format!("t{n}"), "echo", json!(n)))
        .collect();
    scheduler.submit_batch(batch).await.unwrap();

    for n in 0..5 {
        let result = wait_for_status(&scheduler, &format!("t{n}")).await;
        assert_eq!(result.data(), Some(&json!(n)));
    }
    assert!(scheduler.queue_is_empty().await.unwrap());

    scheduler.shutdown();
    running.await.unwrap();
}
