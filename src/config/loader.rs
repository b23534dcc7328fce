// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{
    DEFAULT_BIND_ADDRESS, DEFAULT_LOG_LEVEL, DEFAULT_ORPHAN_TIMEOUT_SECONDS,
};
use crate::engine::DispatchOptions;
use crate::errors::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Server configuration. Every section and field is optional; an empty file
/// yields the defaults.
///
/// ```yaml
/// server:
///   bind: 0.0.0.0:7070
/// dispatch:
///   max_dispatch_per_event: 1
///   orphan_timeout_seconds: 30
/// logging:
///   level: the_taskwood=debug,info
///   json: true
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub dispatch: DispatchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Cap on tasks dispatched per triggering event; absent drains everything ready.
    pub max_dispatch_per_event: Option<usize>,
    /// Orphan deadline in seconds; `0` disables it.
    pub orphan_timeout_seconds: Option<u64>,
}

impl DispatchConfig {
    pub fn get_orphan_timeout_seconds(&self) -> u64 {
        self.orphan_timeout_seconds
            .unwrap_or(DEFAULT_ORPHAN_TIMEOUT_SECONDS)
    }

    /// Runtime options for the scheduler.
    pub fn options(&self) -> DispatchOptions {
        let orphan_timeout = match self.get_orphan_timeout_seconds() {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        };
        DispatchOptions {
            max_dispatch_per_event: self.max_dispatch_per_event,
            orphan_timeout,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Rejects values that parse but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".into()));
        }
        if self.dispatch.max_dispatch_per_event == Some(0) {
            return Err(ConfigError::Invalid(
                "dispatch.max_dispatch_per_event must be at least 1".into(),
            ));
        }
        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not a valid filter: {}",
                self.logging.level, e
            )));
        }
        Ok(())
    }
}

/// Load and validate a config from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse and validate YAML text. Empty input yields the defaults.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let cfg: Config = if content.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(content)?
    };
    cfg.validate()?;
    Ok(cfg)
}
