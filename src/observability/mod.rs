// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured logging for the scheduler, plans and worker connections.
//!
//! Log lines are built from message structs rather than inline strings, so
//! the wording lives in one place and every event carries the same fields
//! whichever subscriber format is in use.
//!
//! * [`messages`] - message types grouped by subsystem
//! * [`init_tracing`] - subscriber setup from [`crate::config::LoggingConfig`]

pub mod messages;
mod tracing_init;

pub use messages::StructuredLog;
pub use tracing_init::init_tracing;
