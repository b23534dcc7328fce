// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::backends::local::LocalExecutor;
use crate::errors::TransportError;
use crate::model::CapabilityKey;
use crate::observability::messages::transport::MalformedMessage;
use crate::observability::messages::StructuredLog;
use crate::traits::TaskExecutor;
use crate::transport::protocol::{
    decode_line, write_message, CapabilityDescriptor, ServerMessage, WorkerMessage,
};

/// The remote side of a connection: registers one capability with a
/// server and runs the tasks it is sent on a [`LocalExecutor`].
pub struct WorkerClient {
    id: String,
    capability: CapabilityKey,
    executor: LocalExecutor,
}

impl WorkerClient {
    pub fn new(capability: impl Into<CapabilityKey>, executor: LocalExecutor) -> Self {
        let capability = capability.into();
        Self {
            id: format!("{}-{}", capability, Uuid::new_v4()),
            capability,
            executor,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub async fn connect<A: ToSocketAddrs>(
        self,
        address: A,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        let stream = TcpStream::connect(address).await?;
        self.run(stream, shutdown).await
    }

    /// Registers over `stream`, then serves tasks until the server hangs up
    /// or `shutdown` fires. Tasks run concurrently; results are written in
    /// completion order.
    pub async fn run<S>(self, stream: S, shutdown: CancellationToken) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();

        write_message(
            &mut writer,
            &WorkerMessage::Register {
                id: self.id.clone(),
                capability: CapabilityDescriptor::new(self.capability.clone()),
            },
        )
        .await?;

        let ack = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        match ack.map(|line| decode_line::<ServerMessage>(&line)).transpose()? {
            Some(ServerMessage::Registered { .. }) => {
                tracing::info!(worker_id = %self.id, capability = %self.capability, "Registered with server");
            }
            Some(ServerMessage::Error { message }) => return Err(TransportError::Rejected(message)),
            Some(other) => {
                return Err(TransportError::Protocol(format!(
                    "expected a registration acknowledgement, got {other:?}"
                )))
            }
            None => return Err(TransportError::ConnectionClosed),
        }

        let (results_tx, mut results) = mpsc::unbounded_channel();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                Some(result) = results.recv() => {
                    write_message(&mut writer, &WorkerMessage::Result(result)).await?;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match decode_line::<ServerMessage>(&line) {
                        Ok(ServerMessage::Task(task)) => {
                            let executor = self.executor.clone();
                            let results_tx = results_tx.clone();
                            tokio::spawn(async move {
                                let result = executor.execute(task).await;
                                let _ = results_tx.send(result);
                            });
                        }
                        Ok(ServerMessage::Error { message }) => {
                            return Err(TransportError::Rejected(message));
                        }
                        Ok(ServerMessage::Registered { .. }) => {
                            tracing::debug!(worker_id = %self.id, "Ignoring repeated registration acknowledgement");
                        }
                        Err(error) => MalformedMessage {
                            peer: "server",
                            error: &error,
                        }
                        .log(),
                    }
                }
            }
        }
    }
}
