// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod executor;
mod registry;
mod worker;

pub use executor::LocalExecutor;
pub use registry::CapabilityRegistry;
pub use worker::LocalWorker;
