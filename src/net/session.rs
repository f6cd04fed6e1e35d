//! Per-connection protocol session.
//!
//! # Responsibilities
//! - Own the stream and the connection's ticket counter
//! - Run the read → decode → dispatch → encode → write loop
//! - Close on EOF, transport failure, framing error, idle timeout or shutdown
//!
//! # Design Decisions
//! - Strictly one request in flight: the next frame is not read until every
//!   packet of the previous reply has been written
//! - Framing errors are fatal; nothing is written back for a bad frame
//! - The ticket is plain owned state, no other task can see it

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use chrono::Utc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::config::FrontendConfig;
use crate::net::connection::ConnectionId;
use crate::observability::metrics;
use crate::protocol::{self, FrameReadError, FramingError, Packet};
use crate::transactions::{Reply, SessionContext, SharedDispatcher};

/// Errors that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("no request received for {0:?}")]
    IdleTimeout(Duration),

    #[error("write did not complete within {0:?}")]
    WriteTimeout(Duration),

    #[error("session already closed")]
    Closed,
}

impl From<FrameReadError> for SessionError {
    fn from(err: FrameReadError) -> Self {
        match err {
            FrameReadError::Framing(e) => SessionError::Framing(e),
            FrameReadError::Io(e) => SessionError::Transport(e),
        }
    }
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream between frames.
    PeerClosed,
    /// Server shutdown was signalled.
    Shutdown,
}

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// Limits applied to one session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub max_frame_bytes: u32,
    /// Close after this long without a complete request.
    pub idle_timeout: Option<Duration>,
    pub write_timeout: Duration,
}

impl SessionOptions {
    pub fn from_config(config: &FrontendConfig) -> Self {
        let idle_secs = config.timeouts.idle_secs;
        Self {
            max_frame_bytes: config.protocol.max_frame_bytes,
            idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            write_timeout: Duration::from_secs(config.timeouts.write_secs),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from_config(&FrontendConfig::default())
    }
}

impl SessionOptions {
    pub fn into_shared(self) -> SharedOptions {
        Arc::new(ArcSwap::from_pointee(self))
    }
}

/// Session limits swapped on config reload; read before every frame.
pub type SharedOptions = Arc<ArcSwap<SessionOptions>>;

/// One client connection.
pub struct Session<S> {
    stream: S,
    connection_id: ConnectionId,
    peer: Option<SocketAddr>,
    dispatcher: SharedDispatcher,
    options: SharedOptions,
    ticket: u32,
    state: SessionState,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        connection_id: ConnectionId,
        peer: Option<SocketAddr>,
        dispatcher: SharedDispatcher,
        options: SessionOptions,
    ) -> Self {
        Self::with_shared_options(stream, connection_id, peer, dispatcher, options.into_shared())
    }

    /// Session that follows limits swapped in by the server on reload.
    pub fn with_shared_options(
        stream: S,
        connection_id: ConnectionId,
        peer: Option<SocketAddr>,
        dispatcher: SharedDispatcher,
        options: SharedOptions,
    ) -> Self {
        Self {
            stream,
            connection_id,
            peer,
            dispatcher,
            options,
            ticket: 0,
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Current ticket counter.
    pub fn ticket(&self) -> u32 {
        self.ticket
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Serve requests until the peer leaves or a fatal error occurs.
    pub async fn run_to_close(&mut self) -> Result<CloseReason, SessionError> {
        self.run(std::future::pending()).await
    }

    /// Serve requests until the peer leaves, a fatal error occurs, or
    /// `shutdown` completes while waiting for the next request.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<CloseReason, SessionError>
    where
        F: Future<Output = ()>,
    {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }

        tokio::pin!(shutdown);
        let result = loop {
            let next = tokio::select! {
                biased;
                _ = &mut shutdown => None,
                frame = self.next_frame() => Some(frame),
            };

            let Some(frame) = next else {
                break Ok(CloseReason::Shutdown);
            };
            let frame = match frame {
                Ok(Some(frame)) => frame,
                Ok(None) => break Ok(CloseReason::PeerClosed),
                Err(e) => break Err(e),
            };

            let request = match protocol::decode(&frame) {
                Ok(request) => request,
                Err(e) => break Err(e.into()),
            };

            match self.process(&request, shutdown.as_mut()).await {
                Ok(true) => {}
                Ok(false) => break Ok(CloseReason::Shutdown),
                Err(e) => break Err(e),
            }
        };

        self.close(&result).await;
        result
    }

    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let (max_frame_bytes, idle_timeout) = {
            let options = self.options.load();
            (options.max_frame_bytes, options.idle_timeout)
        };
        let read = protocol::read_frame(&mut self.stream, max_frame_bytes);
        match idle_timeout {
            Some(idle) => tokio::time::timeout(idle, read)
                .await
                .map_err(|_| SessionError::IdleTimeout(idle))?
                .map_err(Into::into),
            None => read.await.map_err(Into::into),
        }
    }

    /// Handle one decoded request, writing every packet of its reply.
    ///
    /// Returns `false` when shutdown fired before the reply went out.
    async fn process<F>(&mut self, request: &Packet, shutdown: Pin<&mut F>) -> Result<bool, SessionError>
    where
        F: Future<Output = ()>,
    {
        let dispatcher = self.dispatcher.load_full();
        let route = dispatcher.route(request);

        if route.advances_ticket() {
            self.ticket = self.ticket.wrapping_add(1);
        }

        let class = request.class();
        let txn = request.txn().unwrap_or_default();
        if route.advances_ticket() {
            tracing::info!(class = %class, txn = %txn, ticket = self.ticket, "Request");
        } else {
            tracing::debug!(class = %class, txn = %txn, ticket = self.ticket, "Keep-alive");
        }
        metrics::record_transaction(class.as_str(), txn);

        let context = SessionContext::new(self.connection_id, self.peer, self.ticket, Utc::now());
        let Some(reply) = dispatcher.run(route, request, &context) else {
            return Ok(true);
        };

        self.send(&reply, shutdown).await
    }

    async fn send<F>(&mut self, reply: &Reply, shutdown: Pin<&mut F>) -> Result<bool, SessionError>
    where
        F: Future<Output = ()>,
    {
        if let Some(pause) = reply.pause() {
            tokio::select! {
                biased;
                _ = shutdown => return Ok(false),
                _ = tokio::time::sleep(pause) => {}
            }
        }

        for packet in reply.packets() {
            let bytes = protocol::encode(packet, self.ticket).map_err(|e| {
                tracing::error!(error = %e, txn = ?packet.txn(), "Handler produced an unencodable packet");
                e
            })?;
            self.write(&bytes).await?;
        }
        Ok(true)
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), SessionError> {
        let limit = self.options.load().write_timeout;
        let stream = &mut self.stream;
        let write = async {
            stream.write_all(bytes).await?;
            stream.flush().await
        };
        tokio::time::timeout(limit, write)
            .await
            .map_err(|_| SessionError::WriteTimeout(limit))??;
        Ok(())
    }

    async fn close(&mut self, result: &Result<CloseReason, SessionError>) {
        self.state = SessionState::Closed;
        let _ = self.stream.shutdown().await;

        match result {
            Ok(reason) => tracing::info!(reason = ?reason, ticket = self.ticket, "Session closed"),
            Err(SessionError::Framing(e)) => {
                metrics::record_framing_error();
                tracing::warn!(error = %e, "Session dropped on malformed frame");
            }
            Err(e) => tracing::info!(error = %e, "Session ended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Class;
    use crate::transactions::Dispatcher;
    use tokio::io::{duplex, AsyncReadExt};

    fn session(stream: tokio::io::DuplexStream) -> Session<tokio::io::DuplexStream> {
        let dispatcher = Dispatcher::from_config(&FrontendConfig::default()).into_shared();
        Session::new(stream, ConnectionId::new(), None, dispatcher, SessionOptions::default())
    }

    #[tokio::test]
    async fn peer_close_before_any_frame_is_clean() {
        let (client, server) = duplex(1024);
        drop(client);

        let mut session = session(server);
        assert_eq!(session.run_to_close().await.unwrap(), CloseReason::PeerClosed);
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.ticket(), 0);
        assert!(matches!(session.run_to_close().await, Err(SessionError::Closed)));
    }

    #[tokio::test]
    async fn tos_request_advances_ticket_once() {
        let (mut client, server) = duplex(4096);
        let request = Packet::builder(Class::ACCT, 0xC000_0001).txn("NuGetTos").build();
        client.write_all(&protocol::encode(&request, 0).unwrap()).await.unwrap();

        let handle = tokio::spawn(async move {
            let mut session = session(server);
            let result = session.run_to_close().await;
            (result.unwrap(), session.ticket())
        });

        let frame = protocol::read_frame(&mut client, 4096).await.unwrap().unwrap();
        let response = protocol::decode(&frame).unwrap();
        assert_eq!(response.id(), Packet::SERVER_ID + 1);
        drop(client);

        let (reason, ticket) = handle.await.unwrap();
        assert_eq!(reason, CloseReason::PeerClosed);
        assert_eq!(ticket, 1);
    }

    #[tokio::test]
    async fn bad_frame_closes_without_reply() {
        let (mut client, server) = duplex(1024);
        client.write_all(b"fsys\0\0\0\x01\0\0\0\x04").await.unwrap();

        let mut session = session(server);
        let err = session.run_to_close().await.unwrap_err();
        assert!(matches!(err, SessionError::Framing(FramingError::LengthOutOfBounds { .. })));

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn shutdown_interrupts_idle_wait() {
        let (_client, server) = duplex(1024);
        let mut session = session(server);
        let reason = session.run(async {}).await.unwrap();
        assert_eq!(reason, CloseReason::Shutdown);
    }

    #[tokio::test]
    async fn idle_timeout_closes_session() {
        let (_client, server) = duplex(1024);
        let dispatcher = Dispatcher::from_config(&FrontendConfig::default()).into_shared();
        let options = SessionOptions {
            idle_timeout: Some(Duration::from_millis(20)),
            ..SessionOptions::default()
        };
        let mut session = Session::new(server, ConnectionId::new(), None, dispatcher, options);
        assert!(matches!(
            session.run_to_close().await,
            Err(SessionError::IdleTimeout(_))
        ));
    }

    #[tokio::test]
    async fn shutdown_cuts_keep_alive_pause_short() {
        let (mut client, server) = duplex(1024);
        let mut config = FrontendConfig::default();
        config.protocol.memcheck_interval_ms = 60_000;
        let dispatcher = Dispatcher::from_config(&config).into_shared();
        let mut session = Session::new(server, ConnectionId::new(), None, dispatcher, SessionOptions::default());

        let memcheck = Packet::builder(Class::FSYS, 0xC000_0001).txn("MemCheck").build();
        client.write_all(&protocol::encode(&memcheck, 0).unwrap()).await.unwrap();

        let run = session.run(tokio::time::sleep(Duration::from_millis(50)));
        let reason = tokio::time::timeout(Duration::from_secs(2), run)
            .await
            .expect("shutdown waited for the keep-alive pause")
            .unwrap();
        assert_eq!(reason, CloseReason::Shutdown);
        assert_eq!(session.state(), SessionState::Closed);

        let mut rest = Vec::new();
        client.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn reloaded_options_apply_to_next_frame() {
        let (mut client, server) = duplex(4096);
        let shared = SessionOptions::default().into_shared();
        let dispatcher = Dispatcher::from_config(&FrontendConfig::default()).into_shared();
        let mut session = Session::with_shared_options(server, ConnectionId::new(), None, dispatcher, shared.clone());

        let tos = Packet::builder(Class::ACCT, 0xC000_0001).txn("NuGetTos").build();
        let bytes = protocol::encode(&tos, 0).unwrap();
        client.write_all(&bytes).await.unwrap();

        let handle = tokio::spawn(async move { session.run_to_close().await });
        protocol::read_frame(&mut client, u32::MAX).await.unwrap().unwrap();

        shared.store(std::sync::Arc::new(SessionOptions {
            max_frame_bytes: (bytes.len() - 1) as u32,
            ..SessionOptions::default()
        }));
        client.write_all(&bytes).await.unwrap();

        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Framing(FramingError::LengthOutOfBounds { .. })));
    }
}
