//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Compile every redirect so a bad rule is rejected before startup
//! - Detect duplicate redirect names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::redirect::{RedirectError, RedirectRule};

/// A single semantic problem in the configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid {field} {value:?}: expected host:port")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,

    #[error("invalid upstream address {0:?}")]
    InvalidUpstream(String),

    #[error("redirect #{index} has an empty name")]
    EmptyRedirectName { index: usize },

    #[error("duplicate redirect name {0:?}")]
    DuplicateRedirectName(String),

    #[error("redirect {name:?}: {source}")]
    InvalidRedirect {
        name: String,
        #[source]
        source: RedirectError,
    },
}

/// Check the configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if let Some(upstream) = &config.upstream {
        if upstream.address.parse::<Authority>().is_err() {
            errors.push(ValidationError::InvalidUpstream(upstream.address.clone()));
        }
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.redirects.iter().enumerate() {
        if rule.name.trim().is_empty() {
            errors.push(ValidationError::EmptyRedirectName { index });
        } else if !seen.insert(rule.name.as_str()) {
            errors.push(ValidationError::DuplicateRedirectName(rule.name.clone()));
        }

        if let Err(source) = RedirectRule::compile(&rule.redirect, rule.name.as_str()) {
            errors.push(ValidationError::InvalidRedirect {
                name: rule.name.clone(),
                source,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
