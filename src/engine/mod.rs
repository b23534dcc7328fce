// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Scheduling core.
//!
//! * [`ReadyQueue`] - pending tasks, handed out once their dependencies completed
//! * [`PlanRunner`] - drives a lazily produced [`crate::model::Plan`] to the end
//! * [`Dispatcher`] - routes ready tasks to capability endpoints, records results
//! * [`Scheduler`] / [`SchedulerHandle`] - the async context that owns a dispatcher

pub mod dispatcher;
pub mod endpoint;
pub mod plan_runner;
pub mod ready_queue;
pub mod scheduler;
pub mod validation;

#[cfg(test)]
mod integration_tests;

pub use dispatcher::{CapabilityBinding, DispatchOptions, Dispatcher};
pub use endpoint::{endpoint_pair, BindingId, Endpoint, WorkerChannel};
pub use plan_runner::{PlanReport, PlanRunner};
pub use ready_queue::{ReadyQueue, Schedulable};
pub use scheduler::{QueueStats, Scheduler, SchedulerHandle};
pub use validation::validate_submission;
