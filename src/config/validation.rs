//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the bind target (address URI, reserved ports, suffix shape)
//! - Validate value ranges (limits > 0, origin is a usable header value)
//!
//! # Design Decisions
//! - `validate_config` returns all validation errors, not just the first
//! - The per-field checks are shared with `BindTarget`, which stops at the first
//! - Validation is a pure function: LrsConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use hyper::header::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::LrsConfig;

/// The minimum user port per ICANN.
pub const MINIMUM_PORT: u16 = 1024;

/// A single semantic problem with a configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("address parameter is required")]
    MissingAddress,

    #[error("address `{address}` is invalid: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("ports below 1024 are reserved (got {0})")]
    ReservedPort(u16),

    #[error("suffix parameter must be a non-empty string")]
    MissingSuffix,

    #[error("server suffix `{0}` must end with '/'")]
    InvalidSuffix(String),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("default origin `{0}` is not a valid header value")]
    InvalidOrigin(String),

    #[error("metrics address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate the listener address: a bare `http` URI with a host.
pub fn validate_address(address: &str) -> Result<Url, ValidationError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingAddress);
    }

    let invalid = |reason: &str| ValidationError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(trimmed).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" {
        return Err(invalid("only the http scheme is supported"));
    }
    if url.host().is_none() {
        return Err(invalid("a host is required"));
    }
    if url.port().is_some() {
        return Err(invalid("the port is configured separately"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("the path is configured through the suffix"));
    }
    Ok(url)
}

/// Reject ports in the reserved range.
pub fn validate_port(port: u16) -> Result<(), ValidationError> {
    if port < MINIMUM_PORT {
        return Err(ValidationError::ReservedPort(port));
    }
    Ok(())
}

/// The suffix must be non-blank and end with the path separator.
pub fn validate_suffix(suffix: &str) -> Result<(), ValidationError> {
    if suffix.trim().is_empty() {
        return Err(ValidationError::MissingSuffix);
    }
    if !suffix.ends_with('/') {
        return Err(ValidationError::InvalidSuffix(suffix.to_string()));
    }
    Ok(())
}

/// Validate a whole configuration, collecting every error.
pub fn validate_config(config: &LrsConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let listener = &config.listener;

    if let Err(e) = validate_address(&listener.address) {
        errors.push(e);
    }
    if let Err(e) = validate_port(listener.port) {
        errors.push(e);
    }
    if let Err(e) = validate_suffix(&listener.suffix) {
        errors.push(e);
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroLimit("max_connections"));
    }
    if listener.max_body_size == 0 {
        errors.push(ValidationError::ZeroLimit("max_body_size"));
    }

    let origin = &config.cors.default_origin;
    if origin.trim().is_empty() || HeaderValue::from_str(origin).is_err() {
        errors.push(ValidationError::InvalidOrigin(origin.clone()));
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
