//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Backend addresses parse as http URLs with a host
//! - Value ranges (timeouts > 0, bind address valid)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;
use crate::load_balancer::pool::{parse_backend_url, PoolError};

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("no backends configured")]
    NoBackends,
    #[error(transparent)]
    Backend(#[from] PoolError),
    #[error("invalid bind address `{0}`")]
    BindAddress(String),
    #[error("`{0}` must be greater than zero")]
    Zero(&'static str),
}

pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for address in &config.backends {
        if let Err(e) = parse_backend_url(address) {
            errors.push(e.into());
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    let positive = [
        ("health_check.interval_secs", config.health_check.interval_secs),
        ("health_check.timeout_secs", config.health_check.timeout_secs),
        ("health_check.max_concurrent_probes", config.health_check.max_concurrent_probes as u64),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("limits.max_body_bytes", config.limits.max_body_bytes as u64),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero(field));
        }
    }
    if config.retries.max_attempts == Some(0) {
        errors.push(ValidationError::Zero("retries.max_attempts"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
