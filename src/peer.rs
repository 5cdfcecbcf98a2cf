//! Peer builder and accept loop.
//!
//! The [`PeerBuilder`] provides a fluent API for registering handlers and
//! tuning limits. The built [`Peer`] owns the router and the context pool
//! shared by every connection it serves:
//! 1. Accept a connection
//! 2. Create a [`Session`] for it
//! 3. Spawn a task running [`Session::serve`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wirecall::Peer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let peer = Peer::builder()
//!         .pull("/echo", |_ctx, text: String| Ok(text))
//!         .push("/log", |ctx, line: String| {
//!             tracing::info!("{}: {}", ctx.ip(), line);
//!             Ok(())
//!         })
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await?;
//!     Arc::new(peer).serve(listener).await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use crate::codec::Codec;
use crate::error::Result;
use crate::handler::{Context, Router};
use crate::pool::{ContextPool, PoolConfig};
use crate::protocol::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE};
use crate::session::Session;

/// Default socket read buffer size (64 KB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 64 * 1024;

/// Peer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    /// Body codec used when a header names none.
    pub default_codec: Codec,
    /// Largest accepted encoded header.
    pub max_header_size: u32,
    /// Largest accepted body.
    pub max_body_size: u32,
    /// Size of the per-connection read buffer.
    pub read_buffer_size: usize,
    /// Context pool settings.
    pub pool: PoolConfig,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            default_codec: Codec::default(),
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            pool: PoolConfig::default(),
        }
    }
}

/// Builder for configuring and creating a [`Peer`].
pub struct PeerBuilder {
    router: Router,
    config: PeerConfig,
}

impl PeerBuilder {
    /// Create a new peer builder.
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            config: PeerConfig::default(),
        }
    }

    /// Register a pull handler.
    ///
    /// The handler receives the decoded body; its return value is the reply.
    pub fn pull<F, T, R>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + 'static,
    {
        self.router.pull(path, handler);
        self
    }

    /// Register a push handler. No reply is sent.
    pub fn push<F, T, R>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + 'static,
    {
        self.router.push(path, handler);
        self
    }

    /// Set the codec used when a header names none.
    ///
    /// Default: json
    pub fn default_codec(mut self, codec: Codec) -> Self {
        self.config.default_codec = codec;
        self
    }

    /// Set how many released contexts are kept for reuse.
    ///
    /// Default: 1024
    pub fn max_idle_contexts(mut self, limit: usize) -> Self {
        self.config.pool.max_idle = limit;
        self
    }

    /// Set the largest accepted encoded header.
    ///
    /// Default: 64 KB
    pub fn max_header_size(mut self, limit: u32) -> Self {
        self.config.max_header_size = limit;
        self
    }

    /// Set the largest accepted body.
    ///
    /// Default: 64 MB
    pub fn max_body_size(mut self, limit: u32) -> Self {
        self.config.max_body_size = limit;
        self
    }

    /// Set the per-connection read buffer size.
    ///
    /// Default: 64 KB
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size;
        self
    }

    /// Build the peer.
    pub fn build(self) -> Peer {
        Peer {
            router: Arc::new(self.router),
            pool: ContextPool::new(self.config.pool),
            config: self.config,
            next_session: AtomicU64::new(1),
        }
    }
}

impl Default for PeerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A configured peer, ready to serve connections.
pub struct Peer {
    router: Arc<Router>,
    pool: Arc<ContextPool>,
    config: PeerConfig,
    next_session: AtomicU64,
}

impl Peer {
    /// Create a new peer builder.
    pub fn builder() -> PeerBuilder {
        PeerBuilder::new()
    }

    /// Peer configuration.
    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Registered handlers.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Context pool shared by all sessions.
    pub fn pool(&self) -> &Arc<ContextPool> {
        &self.pool
    }

    /// Create a session for a connection from `remote_addr`.
    pub fn session(&self, remote_addr: SocketAddr) -> Arc<Session> {
        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        Arc::new(
            Session::new(id, remote_addr, Arc::clone(&self.router))
                .with_default_codec(self.config.default_codec),
        )
    }

    /// Serve a prepared session over `stream`.
    ///
    /// Lets callers fill the session's public data before the first exchange.
    pub async fn serve_session<S>(&self, session: Arc<Session>, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        session
            .serve(stream, Arc::clone(&self.pool), &self.config)
            .await
    }

    /// Serve one connection until it closes.
    pub async fn serve_connection<S>(&self, stream: S, remote_addr: SocketAddr) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let session = self.session(remote_addr);
        self.serve_session(session, stream).await
    }

    /// Accept connections forever, one task per connection.
    ///
    /// Returns only if accepting fails.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Listening on {}", addr);
        }

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!("Failed to set TCP_NODELAY for {}: {}", remote_addr, e);
            }

            let peer = Arc::clone(&self);
            tokio::spawn(async move {
                if let Err(e) = peer.serve_connection(stream, remote_addr).await {
                    tracing::error!("Connection {} error: {}", remote_addr, e);
                }
            });
        }
    }
}

impl std::fmt::Debug for Peer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Peer")
            .field("handlers", &self.router.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketKind;

    #[test]
    fn test_builder_default() {
        let builder = PeerBuilder::default();
        assert_eq!(builder.config, PeerConfig::default());
        assert!(builder.router.is_empty());
    }

    #[test]
    fn test_builder_method_chaining() {
        let peer = Peer::builder()
            .pull("/echo", |_ctx, text: String| Ok(text))
            .push("/log", |_ctx, _line: String| Ok(()))
            .build();

        assert!(peer.router().route(PacketKind::Pull, "/echo").is_some());
        assert!(peer.router().route(PacketKind::Push, "/log").is_some());
        assert_eq!(peer.router().len(), 2);
    }

    #[test]
    fn test_builder_configuration() {
        let peer = Peer::builder()
            .default_codec(Codec::MsgPack)
            .max_idle_contexts(8)
            .max_header_size(512)
            .max_body_size(4096)
            .read_buffer_size(1024)
            .build();

        let config = peer.config();
        assert_eq!(config.default_codec, Codec::MsgPack);
        assert_eq!(config.pool.max_idle, 8);
        assert_eq!(config.max_header_size, 512);
        assert_eq!(config.max_body_size, 4096);
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(peer.pool().config().max_idle, 8);
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let peer = Peer::builder().default_codec(Codec::MsgPack).build();
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();

        let a = peer.session(addr);
        let b = peer.session(addr);

        assert_ne!(a.id(), b.id());
        assert_eq!(a.default_codec(), Codec::MsgPack);
        assert_eq!(b.remote_addr(), addr);
    }
}
