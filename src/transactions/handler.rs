//! Common handler capability shared by every transaction.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::net::connection::ConnectionId;
use crate::protocol::Packet;

/// Read-only view of the owning session, handed to a handler per request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub connection_id: ConnectionId,
    pub peer: Option<SocketAddr>,
    /// Ticket value the reply will be encoded with.
    pub ticket: u32,
    /// Time the request was decoded.
    pub now: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(connection_id: ConnectionId, peer: Option<SocketAddr>, ticket: u32, now: DateTime<Utc>) -> Self {
        Self {
            connection_id,
            peer,
            ticket,
            now,
        }
    }
}

/// Everything a handler wants written back for one request.
///
/// The session sleeps for `pause` (if any), writes `response`, then writes
/// each follow-up in order before reading the next request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pause: Option<Duration>,
    response: Packet,
    follow_ups: Vec<Packet>,
}

impl Reply {
    pub fn new(response: Packet) -> Self {
        Self {
            pause: None,
            response,
            follow_ups: Vec::new(),
        }
    }

    /// Reply that is only written after `pause` has elapsed.
    pub fn after(pause: Duration, response: Packet) -> Self {
        Self {
            pause: Some(pause),
            ..Self::new(response)
        }
    }

    /// Queue an unsolicited message right after the direct response.
    pub fn with_follow_up(mut self, packet: Packet) -> Self {
        self.follow_ups.push(packet);
        self
    }

    pub fn pause(&self) -> Option<Duration> {
        self.pause
    }

    pub fn response(&self) -> &Packet {
        &self.response
    }

    pub fn follow_ups(&self) -> &[Packet] {
        &self.follow_ups
    }

    /// All outbound packets in write order.
    pub fn packets(&self) -> impl Iterator<Item = &Packet> {
        std::iter::once(&self.response).chain(self.follow_ups.iter())
    }
}

/// A handler for one (class, transaction) pair.
pub trait TransactionHandler: Send + Sync + fmt::Debug {
    /// Build the reply for `request`. Never fails: business errors are
    /// expressed as protocol-shaped responses.
    fn handle(&self, request: &Packet, session: &SessionContext) -> Reply;

    /// Whether this transaction moves the connection's ticket counter.
    fn advances_ticket(&self) -> bool {
        true
    }
}
