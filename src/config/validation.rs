//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and value ranges
//! - Reject greeting/login values that cannot be carried in a field
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FrontendConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::FrontendConfig;
use crate::protocol::HEADER_LEN;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {value:?} is not a valid socket address")]
    InvalidSocketAddr { field: &'static str, value: String },

    #[error("{field}: {value:?} is not a valid IP address")]
    InvalidIp { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must not contain line breaks or NUL bytes")]
    Unencodable(&'static str),

    #[error("{field} must be at least {min}")]
    TooSmall { field: &'static str, min: u64 },
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &FrontendConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::TooSmall {
            field: "listener.max_connections",
            min: 1,
        });
    }

    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::Empty("listener.tls.cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::Empty("listener.tls.key_path"));
        }
    }

    // Header plus the field terminator.
    let min_frame = HEADER_LEN as u64 + 1;
    if u64::from(config.protocol.max_frame_bytes) < min_frame {
        errors.push(ValidationError::TooSmall {
            field: "protocol.max_frame_bytes",
            min: min_frame,
        });
    }

    let services = &config.services;
    check_text(&mut errors, "services.domain", &services.domain);
    check_text(&mut errors, "services.sub_domain", &services.sub_domain);
    check_ip(&mut errors, "services.messenger_ip", &services.messenger_ip);
    check_ip(&mut errors, "services.theater_ip", &services.theater_ip);

    let account = &config.account;
    check_text(&mut errors, "account.tos_version", &account.tos_version);
    check_text(&mut errors, "account.login_key", &account.login_key);
    check_text(&mut errors, "account.persona_name", &account.persona_name);

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidSocketAddr {
            field,
            value: value.to_string(),
        });
    }
}

fn check_ip(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::InvalidIp {
            field,
            value: value.to_string(),
        });
    }
}

fn check_text(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError::Empty(field));
    } else if value.contains(['\n', '\0']) {
        errors.push(ValidationError::Unencodable(field));
    }
}
