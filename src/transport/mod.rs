// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Remote workers over newline-delimited JSON on TCP.
//!
//! [`ConnectionManager`] accepts connections and binds each registered
//! worker on the scheduler through a [`TransportProxy`]. [`WorkerClient`]
//! is the other end.

pub mod manager;
pub mod protocol;
pub mod proxy;
pub mod worker;

#[cfg(test)]
mod integration_tests;

pub use manager::{ConnectionInfo, ConnectionManager, ConnectionRegistry, ConnectionState};
pub use protocol::{CapabilityDescriptor, ServerMessage, WorkerMessage};
pub use proxy::TransportProxy;
pub use worker::WorkerClient;
