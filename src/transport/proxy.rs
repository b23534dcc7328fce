// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::io::{AsyncBufRead, AsyncWrite, Lines};
use tokio_util::sync::CancellationToken;

use crate::engine::{endpoint_pair, Endpoint, WorkerChannel};
use crate::errors::TransportError;
use crate::model::CapabilityKey;
use crate::observability::messages::transport::MalformedMessage;
use crate::observability::messages::StructuredLog;
use crate::transport::protocol::{decode_line, write_message, ServerMessage, WorkerMessage};

/// Local stand-in for a remote worker.
///
/// The scheduler sees an ordinary [`Endpoint`]; the proxy writes each task
/// it receives onto the connection and republishes each result line that
/// comes back.
pub struct TransportProxy<R, W> {
    worker_id: String,
    capability: CapabilityKey,
    peer: String,
    lines: Lines<R>,
    writer: W,
    channel: WorkerChannel,
}

impl<R, W> TransportProxy<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wraps a connection whose registration has already been read.
    /// Returns the proxy and the endpoint to bind on the scheduler.
    pub fn new(
        worker_id: impl Into<String>,
        capability: impl Into<CapabilityKey>,
        peer: impl Into<String>,
        lines: Lines<R>,
        writer: W,
    ) -> (Self, Endpoint) {
        let worker_id = worker_id.into();
        let capability = capability.into();
        let (endpoint, channel) = endpoint_pair(worker_id.clone(), capability.clone());
        let proxy = Self {
            worker_id,
            capability,
            peer: peer.into(),
            lines,
            writer,
            channel,
        };
        (proxy, endpoint)
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub async fn send(&mut self, message: &ServerMessage) -> Result<(), TransportError> {
        write_message(&mut self.writer, message).await
    }

    /// Relays until the worker disconnects, the endpoint is unbound or
    /// `shutdown` fires.
    ///
    /// When the binding is taken over by another registration the worker is
    /// told so before the connection is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), TransportError> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                task = self.channel.tasks.recv() => match task {
                    Some(task) => self.send(&ServerMessage::Task(task)).await?,
                    None => {
                        let message = format!(
                            "capability '{}' is no longer bound to this worker",
                            self.capability
                        );
                        self.send(&ServerMessage::Error { message }).await?;
                        return Ok(());
                    }
                },
                line = self.lines.next_line() => match line? {
                    Some(line) => self.republish(&line),
                    None => return Ok(()),
                },
            }
        }
    }

    fn republish(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match decode_line::<WorkerMessage>(line) {
            Ok(WorkerMessage::Result(result)) => {
                // scheduler side gone; the run loop notices on its next recv
                let _ = self.channel.results.send(result);
            }
            Ok(WorkerMessage::Register { .. }) => {
                let error = TransportError::Protocol("worker is already registered".into());
                MalformedMessage {
                    peer: &self.peer,
                    error: &error,
                }
                .log();
            }
            Err(error) => MalformedMessage {
                peer: &self.peer,
                error: &error,
            }
            .log(),
        }
    }
}
