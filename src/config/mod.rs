// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! YAML configuration for the server binary.
//!
//! [`load_config`] reads and validates a file; every field has a default
//! from [`consts`], so a missing section is never an error.

mod loader;
pub mod consts;

pub use loader::{
    load_config, parse_config, Config, DispatchConfig, LoggingConfig, ServerConfig,
};
