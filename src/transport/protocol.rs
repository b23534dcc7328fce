// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Wire messages between the server and remote workers.
//!
//! One JSON object per line, tagged by `"type"`:
//!
//! ```text
//! worker -> server  {"type":"register","id":"w1","capability":{"type":"shell"}}
//! server -> worker  {"type":"registered","id":"w1","capability":{"type":"shell"}}
//! server -> worker  {"type":"task","id":"t1","executor":"shell","params":{..}}
//! worker -> server  {"type":"result","id":"t1","start":..,"end":..,"outcome":{"status":"success","data":..}}
//! server -> worker  {"type":"error","message":".."}
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::errors::TransportError;
use crate::model::{CapabilityKey, Task, TaskResult};

/// The capability a worker offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    #[serde(rename = "type")]
    pub key: CapabilityKey,
}

impl CapabilityDescriptor {
    pub fn new(key: impl Into<CapabilityKey>) -> Self {
        Self { key: key.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    /// First message on every connection.
    Register {
        id: String,
        capability: CapabilityDescriptor,
    },
    Result(TaskResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges a registration.
    Registered {
        id: String,
        capability: CapabilityDescriptor,
    },
    Task(Task),
    /// Sent before the server closes a connection it will not serve.
    Error { message: String },
}

/// Encodes `message` as one newline-terminated line.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, TransportError> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Writes `message` as one line and flushes it.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let line = encode_line(message)?;
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, TransportError> {
    Ok(serde_json::from_str(line.trim_end())?)
}
