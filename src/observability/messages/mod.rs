// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Every diagnostic the crate emits goes through one of these structs. Each
//! implements `Display` for the human-readable line and [`StructuredLog`]
//! to attach the same data as `tracing` fields.
//!
//! # Organization
//!
//! * `dispatch` - scheduler lifecycle, routing, results, orphans, submissions
//! * `plan` - plan execution progress and subtask failures
//! * `transport` - worker connections and wire protocol problems
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_taskwood::observability::messages::{dispatch::RoutingFailed, StructuredLog};
//!
//! RoutingFailed {
//!     task_id: "t1",
//!     capability: "shell",
//! }
//! .log();
//! ```

use tracing::Span;

pub mod dispatch;
pub mod plan;
pub mod transport;

/// A log message that knows its level and its structured fields.
pub trait StructuredLog {
    /// Emits the message as a `tracing` event at its own level.
    fn log(&self);

    /// A span carrying the message's fields, for scoping follow-up events.
    fn span(&self, name: &str) -> Span;
}
