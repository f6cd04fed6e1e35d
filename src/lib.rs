//! Legacy online-services front-end for console game clients.
//!
//! Speaks the length-prefixed `key=value` transaction protocol over a TLS
//! (or plain) TCP stream: greeting, keep-alive, terms of service, login and
//! account registration, before clients move on to the theater backend.

pub mod config;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod transactions;

pub use config::FrontendConfig;
pub use lifecycle::Shutdown;
pub use server::FeslServer;
