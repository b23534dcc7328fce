// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::engine::SchedulerHandle;
use crate::errors::TransportError;
use crate::model::CapabilityKey;
use crate::observability::messages::transport::{
    ConnectionAccepted, ConnectionClosed, ListenerStarted, RegistrationRejected, WorkerRegistered,
};
use crate::observability::messages::StructuredLog;
use crate::transport::protocol::{decode_line, write_message, ServerMessage, WorkerMessage};
use crate::transport::proxy::TransportProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, registration not yet read.
    Connected,
    Registered,
    /// Only seen on the info returned when a connection is dropped.
    Disconnected,
}

/// What the server knows about one worker connection.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: Uuid,
    pub peer: String,
    pub state: ConnectionState,
    pub worker_id: Option<String>,
    pub capability: Option<CapabilityKey>,
    pub connected_at: DateTime<Utc>,
}

/// Live worker connections, keyed by connection id.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, ConnectionInfo>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connected(&self, peer: &str) -> Uuid {
        let connection_id = Uuid::new_v4();
        let info = ConnectionInfo {
            connection_id,
            peer: peer.to_string(),
            state: ConnectionState::Connected,
            worker_id: None,
            capability: None,
            connected_at: Utc::now(),
        };
        self.connections.write().await.insert(connection_id, info);
        connection_id
    }

    pub async fn registered(&self, connection_id: Uuid, worker_id: &str, capability: &str) {
        if let Some(info) = self.connections.write().await.get_mut(&connection_id) {
            info.state = ConnectionState::Registered;
            info.worker_id = Some(worker_id.to_string());
            info.capability = Some(capability.to_string());
        }
    }

    pub async fn disconnected(&self, connection_id: Uuid) -> Option<ConnectionInfo> {
        let mut info = self.connections.write().await.remove(&connection_id)?;
        info.state = ConnectionState::Disconnected;
        Some(info)
    }

    pub async fn get(&self, connection_id: Uuid) -> Option<ConnectionInfo> {
        self.connections.read().await.get(&connection_id).cloned()
    }

    /// Registered workers, oldest connection first.
    pub async fn connected_workers(&self) -> Vec<ConnectionInfo> {
        let connections = self.connections.read().await;
        let mut workers: Vec<ConnectionInfo> = connections
            .values()
            .filter(|info| info.state == ConnectionState::Registered)
            .cloned()
            .collect();
        workers.sort_by_key(|info| info.connected_at);
        workers
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }
}

/// Accepts worker connections and binds each registered worker on the
/// scheduler through a [`TransportProxy`].
#[derive(Clone)]
pub struct ConnectionManager {
    scheduler: SchedulerHandle,
    registry: ConnectionRegistry,
}

impl ConnectionManager {
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            registry: ConnectionRegistry::new(),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub async fn connected_workers(&self) -> Vec<ConnectionInfo> {
        self.registry.connected_workers().await
    }

    /// Accepts connections until `shutdown` fires. Each connection is served
    /// on its own task; a failed accept is logged and skipped.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError> {
        let address = listener.local_addr()?.to_string();
        ListenerStarted { address: &address }.log();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(error) => {
                            tracing::warn!(error = %error, "Failed to accept worker connection");
                            continue;
                        }
                    };
                    let manager = self.clone();
                    let connection_shutdown = shutdown.child_token();
                    tokio::spawn(async move {
                        let peer = peer.to_string();
                        if let Err(error) = manager
                            .handle_connection(stream, &peer, connection_shutdown)
                            .await
                        {
                            tracing::warn!(peer = %peer, error = %error, "Worker connection ended with an error");
                        }
                    });
                }
            }
        }
    }

    /// Serves one connection from registration to disconnect. The worker's
    /// binding is removed on the way out unless another worker has already
    /// taken the capability over.
    pub async fn handle_connection<S>(
        &self,
        stream: S,
        peer: &str,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let accepted = ConnectionAccepted { peer };
        accepted.log();
        let span = accepted.span("worker_connection");

        let connection_id = self.registry.connected(peer).await;
        let outcome = self
            .serve_connection(connection_id, stream, peer, shutdown)
            .instrument(span)
            .await;

        let info = self.registry.disconnected(connection_id).await;
        ConnectionClosed {
            peer,
            worker_id: info.as_ref().and_then(|i| i.worker_id.as_deref()),
        }
        .log();
        outcome
    }

    async fn serve_connection<S>(
        &self,
        connection_id: Uuid,
        stream: S,
        peer: &str,
        shutdown: CancellationToken,
    ) -> Result<(), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut lines = BufReader::new(reader).lines();

        let first = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            line = lines.next_line() => line?,
        };
        let Some(first) = first else {
            return Ok(());
        };

        let (worker_id, capability) = match decode_line::<WorkerMessage>(&first) {
            Ok(WorkerMessage::Register { id, capability })
                if !id.trim().is_empty() && !capability.key.trim().is_empty() =>
            {
                (id, capability)
            }
            Ok(WorkerMessage::Register { .. }) => {
                return reject(&mut writer, peer, "registration needs a worker id and a capability type")
                    .await
            }
            Ok(_) => {
                return reject(&mut writer, peer, "first message must be a registration").await
            }
            Err(error) => return reject(&mut writer, peer, &error.to_string()).await,
        };

        let (mut proxy, endpoint) =
            TransportProxy::new(worker_id.clone(), capability.key.clone(), peer, lines, writer);
        let binding = self.scheduler.register_endpoint(endpoint).await?;
        self.registry
            .registered(connection_id, &worker_id, &capability.key)
            .await;
        WorkerRegistered {
            worker_id: &worker_id,
            capability: &capability.key,
            peer,
        }
        .log();

        let outcome = async {
            proxy
                .send(&ServerMessage::Registered {
                    id: worker_id.clone(),
                    capability: capability.clone(),
                })
                .await?;
            proxy.run(shutdown).await
        }
        .await;

        // a stopped scheduler has nothing left to unbind
        let _ = self
            .scheduler
            .unregister_endpoint(&capability.key, Some(binding))
            .await;
        outcome
    }
}

async fn reject<W>(writer: &mut W, peer: &str, reason: &str) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    RegistrationRejected { peer, reason }.log();
    write_message(
        writer,
        &ServerMessage::Error {
            message: reason.to_string(),
        },
    )
    .await?;
    Err(TransportError::Protocol(reason.to_string()))
}
