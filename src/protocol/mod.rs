//! Wire protocol subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming bytes (TLS or plain stream)
//!     → framing.rs (read one length-prefixed frame)
//!     → codec.rs (header + key=value section → Packet)
//!     → Hand off to transactions layer
//!
//! Outgoing Packet
//!     → codec.rs (Packet + ticket → bytes)
//!     → written back by the session
//! ```
//!
//! # Wire Layout
//! ```text
//! +---------------+-----------------+-----------------+------------------------+
//! | class (4 B)   | id (u32 BE)     | length (u32 BE) | key=value\n ... \0     |
//! +---------------+-----------------+-----------------+------------------------+
//! ```
//!
//! # Design Decisions
//! - No state in this layer; the ticket is an explicit encode argument
//! - Malformed frames are rejected, never resynchronized
//! - Field values are flat strings; nesting lives in dotted key names

pub mod codec;
pub mod error;
pub mod escape;
pub mod framing;
pub mod packet;

pub use codec::{correlation_id, decode, encode, Header, HEADER_LEN};
pub use error::FramingError;
pub use framing::{read_frame, FrameReadError};
pub use packet::{Class, Fields, Packet, PacketBuilder};
