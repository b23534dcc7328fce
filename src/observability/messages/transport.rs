// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for worker connections.
//!
//! This module contains message types for logging events related to:
//! * The listener and inbound connections
//! * Worker registration and its rejection
//! * Malformed or unexpected wire messages
//! * Disconnects

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// # Log Level
/// `info!` - Important operational event
pub struct ListenerStarted<'a> {
    pub address: &'a str,
}

impl Display for ListenerStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Accepting worker connections on {}", self.address)
    }
}

impl StructuredLog for ListenerStarted<'_> {
    fn log(&self) {
        tracing::info!(address = self.address, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("listener", span_name = name, address = self.address)
    }
}

pub struct ConnectionAccepted<'a> {
    pub peer: &'a str,
}

impl Display for ConnectionAccepted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Connection accepted from {}", self.peer)
    }
}

impl StructuredLog for ConnectionAccepted<'_> {
    fn log(&self) {
        tracing::debug!(peer = self.peer, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("connection", span_name = name, peer = self.peer)
    }
}

/// A worker registered a capability over its connection.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_taskwood::observability::messages::transport::WorkerRegistered;
///
/// let msg = WorkerRegistered {
///     worker_id: "worker-1",
///     capability: "shell",
///     peer: "127.0.0.1:53000",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct WorkerRegistered<'a> {
    pub worker_id: &'a str,
    pub capability: &'a str,
    pub peer: &'a str,
}

impl Display for WorkerRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker '{}' registered capability '{}' from {}",
            self.worker_id, self.capability, self.peer
        )
    }
}

impl StructuredLog for WorkerRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            worker_id = self.worker_id,
            capability = self.capability,
            peer = self.peer,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "connection",
            span_name = name,
            worker_id = self.worker_id,
            capability = self.capability,
        )
    }
}

/// The first message on a connection was not a registration.
///
/// # Log Level
/// `warn!` - Connection closed by the server
pub struct RegistrationRejected<'a> {
    pub peer: &'a str,
    pub reason: &'a str,
}

impl Display for RegistrationRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rejected registration from {}: {}",
            self.peer, self.reason
        )
    }
}

impl StructuredLog for RegistrationRejected<'_> {
    fn log(&self) {
        tracing::warn!(peer = self.peer, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("connection", span_name = name, peer = self.peer)
    }
}

/// A line on an established connection could not be decoded or was not
/// expected in the current state. The line is skipped.
///
/// # Log Level
/// `warn!` - Peer bug
pub struct MalformedMessage<'a> {
    pub peer: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for MalformedMessage<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Ignoring malformed message from {}: {}", self.peer, self.error)
    }
}

impl StructuredLog for MalformedMessage<'_> {
    fn log(&self) {
        tracing::warn!(peer = self.peer, error = %self.error, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("connection", span_name = name, peer = self.peer)
    }
}

pub struct ConnectionClosed<'a> {
    pub peer: &'a str,
    pub worker_id: Option<&'a str>,
}

impl Display for ConnectionClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.worker_id {
            Some(worker_id) => write!(f, "Worker '{}' at {} disconnected", worker_id, self.peer),
            None => write!(f, "Unregistered connection from {} closed", self.peer),
        }
    }
}

impl StructuredLog for ConnectionClosed<'_> {
    fn log(&self) {
        tracing::info!(peer = self.peer, worker_id = ?self.worker_id, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("connection", span_name = name, peer = self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_closed_distinguishes_registered_workers() {
        let registered = ConnectionClosed {
            peer: "10.0.0.1:9",
            worker_id: Some("w1"),
        };
        let anonymous = ConnectionClosed {
            peer: "10.0.0.1:9",
            worker_id: None,
        };

        assert_eq!(registered.to_string(), "Worker 'w1' at 10.0.0.1:9 disconnected");
        assert_eq!(
            anonymous.to_string(),
            "Unregistered connection from 10.0.0.1:9 closed"
        );
    }
}
