//! Configuration shape consumed by the core at construction time.
//!
//! Mirrors `loadAggregatorConfig` in the original aggregator service: the
//! core only reads `symbol`, `expected_exchanges`, and `publish_interval_ms`
//! directly, but accepts `feed_descriptors` and `grpc` as pass-through
//! sections whose actual consumers (feed adapters, the transport layer) live
//! outside the core's scope.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level configuration for a running aggregator instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// The single trading symbol this instance aggregates.
    pub symbol: String,
    /// Venues that must each produce at least one event before the engine
    /// publishes; empty disables the readiness gate.
    #[serde(default)]
    pub expected_exchanges: Vec<String>,
    /// Advisory hint for external publishers; not a hard throttle in the core.
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u32,
    /// Consumed only by external feed adapters, not by the core.
    #[serde(default)]
    pub feed_descriptors: Vec<FeedConfig>,
    /// Consumed only by the transport layer, not by the core.
    #[serde(default)]
    pub grpc: GrpcConfig,
}

fn default_publish_interval_ms() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub interval_ms: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub auth_token: String,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

impl Default for GrpcConfig {
    fn default() -> Self {
        GrpcConfig {
            listen_address: default_listen_address(),
            port: default_port(),
            auth_token: String::new(),
        }
    }
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}
