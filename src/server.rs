//! Accept loop and per-connection task spawning.
//!
//! # Responsibilities
//! - Accept connections from the bounded listener
//! - Run the optional TLS handshake under a deadline
//! - Spawn one session task per connection, inside a tracing span
//! - Swap in a freshly built dispatcher on config reload
//! - Drain live sessions on shutdown

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio_rustls::TlsAcceptor;
use tracing::Instrument;

use crate::config::FrontendConfig;
use crate::lifecycle::shutdown::signalled;
use crate::net::connection::{ConnectionGuard, ConnectionTracker};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};
use crate::net::session::{Session, SessionOptions, SharedOptions};
use crate::net::tls::{load_tls_acceptor, TlsError};
use crate::observability::metrics;
use crate::transactions::{Dispatcher, SharedDispatcher};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// Front-end server: owns the shared read-only state every session uses.
pub struct FeslServer {
    config: FrontendConfig,
    dispatcher: SharedDispatcher,
    options: SharedOptions,
    tls: Option<TlsAcceptor>,
    tracker: ConnectionTracker,
}

impl FeslServer {
    /// Plain TCP server.
    pub fn new(config: FrontendConfig) -> Self {
        let dispatcher = Dispatcher::from_config(&config).into_shared();
        let options = SessionOptions::from_config(&config).into_shared();
        Self {
            config,
            dispatcher,
            options,
            tls: None,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Server with TLS material loaded from the listener configuration.
    pub async fn from_config(config: FrontendConfig) -> Result<Self, ServerError> {
        let tls = match &config.listener.tls {
            Some(tls) => Some(load_tls_acceptor(Path::new(&tls.cert_path), Path::new(&tls.key_path)).await?),
            None => None,
        };
        let mut server = Self::new(config);
        server.tls = tls;
        Ok(server)
    }

    pub fn with_tls(mut self, acceptor: TlsAcceptor) -> Self {
        self.tls = Some(acceptor);
        self
    }

    pub fn config(&self) -> &FrontendConfig {
        &self.config
    }

    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Accept connections until `shutdown` fires, then drain.
    pub async fn run(
        mut self,
        listener: Listener,
        mut config_updates: mpsc::UnboundedReceiver<FrontendConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        tracing::info!(
            address = ?listener.local_addr().ok(),
            tls = self.tls.is_some(),
            "Front-end server starting"
        );

        let mut updates_open = true;
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                update = config_updates.recv(), if updates_open => match update {
                    Some(config) => self.apply_config(config),
                    None => updates_open = false,
                },
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => self.spawn_connection(stream, peer, permit, &shutdown),
                    Err(ListenerError::Closed) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
            }
        }

        drop(listener);
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            grace = ?grace,
            "Draining connections"
        );
        if !self.tracker.drain(grace).await {
            tracing::warn!(
                active_connections = self.tracker.active_count(),
                "Shutdown grace period elapsed with connections still open"
            );
        }

        tracing::info!("Front-end server stopped");
        Ok(())
    }

    fn apply_config(&mut self, mut config: FrontendConfig) {
        if config.listener != self.config.listener {
            tracing::warn!("Listener changes require a restart and were not applied");
            config.listener = self.config.listener.clone();
        }

        self.dispatcher.store(Arc::new(Dispatcher::from_config(&config)));
        self.options.store(Arc::new(SessionOptions::from_config(&config)));
        self.config = config;
        tracing::info!("Configuration reloaded");
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: ConnectionPermit,
        shutdown: &broadcast::Receiver<()>,
    ) {
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }

        let guard = self.tracker.track();
        let span = tracing::info_span!("session", connection_id = %guard.id(), peer = %peer);
        let ctx = ConnectionTask {
            guard,
            peer,
            dispatcher: self.dispatcher.clone(),
            options: self.options.clone(),
            shutdown: shutdown.resubscribe(),
        };
        let tls = self.tls.clone();
        let handshake_limit = Duration::from_secs(self.config.timeouts.handshake_secs);

        tokio::spawn(
            async move {
                let _permit = permit;
                tracing::info!("Connection incoming");

                let Some(acceptor) = tls else {
                    ctx.serve(stream).await;
                    return;
                };

                match tokio::time::timeout(handshake_limit, acceptor.accept(stream)).await {
                    Ok(Ok(tls_stream)) => {
                        tracing::debug!("TLS handshake complete");
                        ctx.serve(tls_stream).await;
                    }
                    Ok(Err(e)) => {
                        metrics::record_tls_handshake_failure();
                        tracing::warn!(error = %e, "TLS handshake failed");
                    }
                    Err(_) => {
                        metrics::record_tls_handshake_failure();
                        tracing::warn!(limit = ?handshake_limit, "TLS handshake timed out");
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Everything a spawned connection task owns besides its stream.
struct ConnectionTask {
    guard: ConnectionGuard,
    peer: SocketAddr,
    dispatcher: SharedDispatcher,
    options: SharedOptions,
    shutdown: broadcast::Receiver<()>,
}

impl ConnectionTask {
    async fn serve<S>(self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut session = Session::with_shared_options(
            stream,
            self.guard.id(),
            Some(self.peer),
            self.dispatcher,
            self.options,
        );
        // Outcome is logged by the session itself.
        let _ = session.run(signalled(self.shutdown)).await;
        drop(self.guard);
    }
}
