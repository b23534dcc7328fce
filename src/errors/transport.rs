// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use super::DispatchError;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed wire message: {0}")]
    Codec(#[from] serde_json::Error),

    /// The peer sent a well-formed message that is not valid at this point.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server answered the registration with an error message.
    #[error("registration rejected: {0}")]
    Rejected(String),

    #[error("connection closed by peer")]
    ConnectionClosed,

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
