//! Transaction subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded Packet (class, TXN, fields)
//!     → dispatcher.rs (lookup by (class, TXN))
//!     → system.rs / account.rs handler
//!     → Reply (optional pause, response, follow-ups)
//!     → back to the session for encoding
//! ```
//!
//! # Design Decisions
//! - Handlers are plain functions of (request, session view) → Reply
//! - Handlers never touch the stream and never close the connection
//! - Business failures are ordinary responses, not errors

pub mod account;
pub mod dispatcher;
pub mod handler;
pub mod system;

pub use dispatcher::{Dispatcher, Route, SharedDispatcher};
pub use handler::{Reply, SessionContext, TransactionHandler};

/// Greeting (`fsys`).
pub const HELLO: &str = "Hello";
/// Keep-alive (`fsys`).
pub const MEMCHECK: &str = "MemCheck";
/// Terms-of-service retrieval (`acct`).
pub const GET_TOS: &str = "NuGetTos";
/// Login (`acct`).
pub const LOGIN: &str = "NuPS3Login";
/// Account registration (`acct`).
pub const ADD_ACCOUNT: &str = "NuPS3AddAccount";
