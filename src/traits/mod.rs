// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod capability;
pub mod executor;

pub use capability::{Capability, Execution};
pub use executor::TaskExecutor;
