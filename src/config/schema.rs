//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the front-end.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the front-end server.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct FrontendConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Wire protocol limits and policies.
    pub protocol: ProtocolConfig,

    /// Companion services advertised in the greeting.
    pub services: ServicesConfig,

    /// Account transaction policy.
    pub account: AccountConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:18800").
    pub bind_address: String,

    /// Optional TLS configuration. Plain TCP when absent.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:18800".to_string(),
            tls: None,
            max_connections: 1024,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration for connection handling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Close a connection after this long without a request. 0 disables.
    pub idle_secs: u64,

    /// TLS handshake deadline in seconds.
    pub handshake_secs: u64,

    /// Deadline for writing one reply in seconds.
    pub write_secs: u64,

    /// How long shutdown waits for open connections to finish.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 300,
            handshake_secs: 10,
            write_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

/// What to do with a request no handler is registered for.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnknownTransactionPolicy {
    /// Log a warning and write nothing.
    #[default]
    Ignore,
    /// Reply with the request's class and transaction name only.
    Acknowledge,
}

/// Wire protocol configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Largest accepted frame, header included.
    pub max_frame_bytes: u32,

    /// Pause before answering a keep-alive with a new challenge.
    pub memcheck_interval_ms: u64,

    /// Policy for unrecognized transactions.
    pub unknown_transaction: UnknownTransactionPolicy,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 64 * 1024,
            memcheck_interval_ms: 1000,
            unknown_transaction: UnknownTransactionPolicy::Ignore,
        }
    }
}

/// Endpoints and labels advertised to clients in the greeting.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServicesConfig {
    /// Domain partition (e.g., "ps3").
    pub domain: String,

    /// Domain sub-partition (e.g., "BEACH").
    pub sub_domain: String,

    pub messenger_ip: String,
    pub messenger_port: u16,

    pub theater_ip: String,
    pub theater_port: u16,

    /// Client inactivity timeout advertised to the client.
    pub activity_timeout_secs: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            domain: "ps3".to_string(),
            sub_domain: "BEACH".to_string(),
            messenger_ip: "127.0.0.1".to_string(),
            messenger_port: 0,
            theater_ip: "127.0.0.1".to_string(),
            theater_port: 18236,
            activity_timeout_secs: 0,
        }
    }
}

/// Account transaction policy.
///
/// There is no account store: login and terms responses come from here.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AccountConfig {
    /// Terms-of-service document, unescaped.
    pub tos_text: String,

    /// Version tag sent with the terms.
    pub tos_version: String,

    /// Session key handed out on successful login.
    pub login_key: String,

    /// Synthetic user id handed out on successful login.
    pub user_id: u64,

    /// Display name handed out on successful login.
    pub persona_name: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            tos_text: "Welcome to Arcadia!\nBeware, here be dragons!".to_string(),
            tos_version: "20426_17.20426_17".to_string(),
            login_key: "W5NyZzxSaUr4131gCki6GQAAKDw.".to_string(),
            user_id: 1_000_000_000_000,
            persona_name: "faith".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "fesl_frontend=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: FrontendConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:18800");
        assert!(config.listener.tls.is_none());
        assert_eq!(config.services.theater_port, 18236);
        assert_eq!(config.protocol.memcheck_interval_ms, 1000);
        assert_eq!(config.account.user_id, 1_000_000_000_000);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config: FrontendConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [listener.tls]
            cert_path = "cert.pem"
            key_path = "key.pem"

            [protocol]
            unknown_transaction = "acknowledge"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.listener.max_connections, 1024);
        assert_eq!(config.listener.tls.unwrap().key_path, "key.pem");
        assert_eq!(
            config.protocol.unknown_transaction,
            UnknownTransactionPolicy::Acknowledge
        );
        assert_eq!(config.protocol.max_frame_bytes, 65536);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
