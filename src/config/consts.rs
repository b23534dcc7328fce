// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Address the worker listener binds to when none is configured
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:7070";
/// Seconds an orphaned in-flight task waits for a late result before failing
pub const DEFAULT_ORPHAN_TIMEOUT_SECONDS: u64 = 30;
/// Default `EnvFilter` directive when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";
