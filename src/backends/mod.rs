// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process execution backends.
//!
//! ## Local Backend
//! - [`local::CapabilityRegistry`]: capability implementations by key
//! - [`local::LocalExecutor`]: runs a task against the registry, driving
//!   any plan a capability returns
//! - [`local::LocalWorker`]: a capability endpoint served in-process,
//!   bound to a scheduler like a remote worker would be
//!
//! ## Stub Backend (Test-Only)
//! Echo, delayed, failing and plan-producing capabilities for tests. Only
//! compiled in test builds.

pub mod local;
#[cfg(test)]
pub mod stub;
