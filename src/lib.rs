// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // in-process capabilities and workers
pub mod config;     // server configuration
pub mod engine;     // ready queue, dispatcher, scheduler, plan runner
pub mod errors;     // error handling
pub mod model;      // tasks, results, plans
pub mod observability;
pub mod traits;     // capability and executor seams
pub mod transport;  // remote workers over TCP
