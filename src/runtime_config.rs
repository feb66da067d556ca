//! # Runtime Configuration Module
//!
//! Environment-driven settings read once at startup.
//!
//! ## Environment Variables
//!
//! ### `TYPEDAPI_MAX_BODY_BYTES`
//!
//! Largest request body the dispatcher will parse. Accepts decimal
//! (`1048576`) or hexadecimal (`0x100000`). Larger bodies are rejected with
//! `400 Bad Request` before any JSON parsing.
//!
//! Default: `0x100000` (1 MiB)
//!
//! ### `TYPEDAPI_LOG_FORMAT`
//!
//! `json` for one JSON object per line, `pretty` for human readable output.
//!
//! Default: `pretty`
//!
//! ### `TYPEDAPI_LOG_LEVEL`
//!
//! An `EnvFilter` directive such as `info` or `typedapi=debug`. `RUST_LOG`
//! takes precedence when set.
//!
//! Default: `info`
//!
//! ## Usage
//!
//! ```rust
//! use typedapi::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Body limit: {} bytes", config.max_body_bytes);
//! ```

use crate::logging::{LogConfig, LogFormat};
use std::env;

pub const DEFAULT_MAX_BODY_BYTES: usize = 0x10_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub max_body_bytes: usize,
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            log: LogConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`RuntimeConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_body_bytes = lookup("TYPEDAPI_MAX_BODY_BYTES")
            .and_then(|val| parse_size(&val))
            .unwrap_or(DEFAULT_MAX_BODY_BYTES);
        let log = LogConfig {
            format: lookup("TYPEDAPI_LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or_default(),
            level: lookup("TYPEDAPI_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };
        RuntimeConfig {
            max_body_bytes,
            log,
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    match val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => val.parse().ok(),
    }
}
