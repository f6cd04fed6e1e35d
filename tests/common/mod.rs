//! Shared utilities for session and server integration tests.

#![allow(dead_code)]

use std::time::Duration;

use tokio::io::{duplex, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use fesl_frontend::config::FrontendConfig;
use fesl_frontend::net::{CloseReason, ConnectionId, Session, SessionError, SessionOptions};
use fesl_frontend::protocol::{self, Class, Packet};
use fesl_frontend::transactions::Dispatcher;

/// First id a test client uses for its requests.
pub const CLIENT_ID: u32 = 0xC000_0001;

/// Configuration with the keep-alive pause shortened for tests.
pub fn test_config() -> FrontendConfig {
    let mut config = FrontendConfig::default();
    config.protocol.memcheck_interval_ms = 10;
    config
}

/// Run a session over an in-memory pipe and hand back the client end.
pub fn spawn_session(
    config: &FrontendConfig,
) -> (DuplexStream, JoinHandle<Result<CloseReason, SessionError>>) {
    let (client, server) = duplex(64 * 1024);
    let dispatcher = Dispatcher::from_config(config).into_shared();
    let options = SessionOptions::from_config(config);

    let handle = tokio::spawn(async move {
        let mut session = Session::new(server, ConnectionId::new(), None, dispatcher, options);
        session.run_to_close().await
    });
    (client, handle)
}

/// Build a request packet for `class`/`txn` with extra fields.
pub fn request(class: Class, txn: &str, fields: &[(&str, &str)]) -> Packet {
    fields
        .iter()
        .fold(Packet::builder(class, CLIENT_ID).txn(txn), |builder, (key, value)| {
            builder.field(*key, value)
        })
        .build()
}

/// Write one request as the client would.
pub async fn send<W>(stream: &mut W, packet: &Packet)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let bytes = protocol::encode(packet, 0).unwrap();
    stream.write_all(&bytes).await.unwrap();
}

/// Read and decode the next server packet, failing the test after a second.
pub async fn recv<R>(stream: &mut R) -> Packet
where
    R: tokio::io::AsyncRead + Unpin,
{
    let frame = tokio::time::timeout(Duration::from_secs(1), protocol::read_frame(stream, u32::MAX))
        .await
        .expect("no reply within a second")
        .unwrap()
        .expect("stream closed before a reply");
    protocol::decode(&frame).unwrap()
}

/// Assert nothing arrives within `window`.
pub async fn assert_silent<R>(stream: &mut R, window: Duration)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let read = tokio::time::timeout(window, protocol::read_frame(stream, u32::MAX)).await;
    assert!(read.is_err(), "unexpected frame: {read:?}");
}
