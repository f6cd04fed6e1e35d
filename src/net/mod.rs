//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (optional TLS handshake)
//!     → connection.rs (identity, live connection tracking)
//!     → session.rs (protocol loop until the stream closes)
//!
//! Session States:
//!     Open → Closed
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - TLS is optional and handled transparently; sessions only see a stream

pub mod connection;
pub mod listener;
pub mod session;
pub mod tls;

pub use connection::{ConnectionId, ConnectionTracker};
pub use listener::Listener;
pub use session::{CloseReason, Session, SessionError, SessionOptions, SessionState, SharedOptions};
