// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod dispatch;
mod execution;
mod transport;
mod validation;

pub use config::ConfigError;
pub use dispatch::DispatchError;
pub use execution::ExecutionError;
pub use transport::TransportError;
pub use validation::{SubmissionError, ValidationError};
