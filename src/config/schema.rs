//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the local LRS.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Default bind address, matching the remote LRS endpoint hosts expect.
pub const DEFAULT_ADDRESS: &str = "http://127.0.0.1";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default path suffix appended after the port.
pub const DEFAULT_SUFFIX: &str = "/";

/// Origin allowed when the delegate supplies none (local file content).
pub const DEFAULT_ALLOWED_ORIGIN: &str = "file://";

/// Root configuration for the local LRS server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct LrsConfig {
    /// Listener configuration (address, port, suffix, limits).
    pub listener: ListenerConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Scheme and host (e.g., "http://127.0.0.1"). No port, no path.
    pub address: String,

    /// TCP port. Ports below 1024 are rejected.
    pub port: u16,

    /// Path prefix the server answers under. Must end with '/'.
    pub suffix: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            suffix: DEFAULT_SUFFIX.to_string(),
            max_connections: 1024,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// `Access-Control-Allow-Origin` value used when the delegate has none.
    pub default_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            default_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
