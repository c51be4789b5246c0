//! Chat server: accept loop and per-session task management.
//!
//! This module is responsible for:
//!
//! 1. Binding a TCP listener on the configured address.
//! 2. Accepting incoming connections from peers.
//! 3. Splitting each connection into a buffered read half (owned by the
//!    session) and a [`ConnectionWriter`] (shared through the registry).
//! 4. Spawning one Tokio task per connection to run its [`Session`].
//! 5. Stopping the accept loop when the `running` flag is cleared.
//!
//! A session that fails only ends its own task; the accept loop and every
//! other session keep going.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::application::registry::SessionRegistry;
use crate::application::session::{ChatHub, Session};
use crate::application::EventSink;
use crate::infrastructure::network::connection::ConnectionWriter;
use crate::infrastructure::storage::config::ServerConfig;

/// How often the accept loop wakes up to check the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A bound, not yet running, chat server.
pub struct ChatServer {
    listener: TcpListener,
    hub: ChatHub,
}

impl ChatServer {
    /// Binds the listener described by `config`.
    ///
    /// Binding is separate from [`ChatServer::serve`] so callers (and tests)
    /// can learn the actual address when binding to port 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is invalid or the port cannot be
    /// bound (already in use, insufficient permission).
    pub async fn bind(config: &ServerConfig, events: Arc<dyn EventSink>) -> anyhow::Result<Self> {
        let addr = config.network.socket_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind chat listener on {addr}"))?;

        let hub = ChatHub::new(
            SessionRegistry::new(),
            events,
            config.chat.max_username_length,
            config.chat.write_timeout(),
        );

        Ok(Self { listener, hub })
    }

    /// The address the listener is actually bound to.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS cannot report the socket address.
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("failed to read listener address")
    }

    /// Handle to the shared registry, for inspection.
    pub fn registry(&self) -> SessionRegistry {
        self.hub.registry().clone()
    }

    /// Runs the accept loop until `running` is set to `false`.
    ///
    /// Sessions already in progress are not cancelled; they end when their
    /// peers disconnect or the runtime shuts down.
    pub async fn serve(self, running: Arc<AtomicBool>) -> anyhow::Result<()> {
        info!("chat server listening on {}", self.local_addr()?);

        loop {
            if !running.load(Ordering::Relaxed) {
                info!("shutdown flag set; stopping accept loop");
                break;
            }

            // The timeout lets the loop notice the shutdown flag even when no
            // peer is connecting.
            match timeout(ACCEPT_POLL_INTERVAL, self.listener.accept()).await {
                Ok(Ok((stream, peer_addr))) => {
                    info!("new connection from {peer_addr}");
                    let hub = self.hub.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, hub).await;
                    });
                }
                Ok(Err(e)) => {
                    // Transient accept error (e.g., too many open file descriptors).
                    error!("accept error: {e}");
                }
                Err(_) => {}
            }
        }

        Ok(())
    }
}

/// Runs one session to completion and logs how it ended.
async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, hub: ChatHub) {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("session {peer_addr}: could not disable Nagle: {e}");
    }

    let (read_half, write_half) = stream.into_split();
    let session = Session::new(
        peer_addr,
        BufReader::new(read_half),
        Arc::new(ConnectionWriter::new(write_half)),
        hub,
    );

    match session.run().await {
        Ok(()) => info!("session {peer_addr} closed normally"),
        Err(e) => warn!("session {peer_addr} closed with error: {e}"),
    }
}
