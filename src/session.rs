//! A connection and the state its exchanges share.
//!
//! A [`Session`] holds what outlives a single exchange: the remote address,
//! the public data every exchange gets a copy of, the router and the default
//! body codec. [`Session::serve`] drives one connection: it reads frames,
//! runs each through a pooled context and writes back replies, one exchange
//! at a time.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::codec::Codec;
use crate::error::{Result, WirecallError};
use crate::handler::Router;
use crate::peer::PeerConfig;
use crate::pool::ContextPool;
use crate::protocol::FrameBuffer;
use crate::scope::PublicStore;

/// Per-connection state.
#[derive(Debug)]
pub struct Session {
    id: u64,
    remote_addr: SocketAddr,
    public: PublicStore,
    router: Arc<Router>,
    default_codec: Codec,
    exchanges: AtomicU64,
}

impl Session {
    /// Create a session for a connection from `remote_addr`.
    pub fn new(id: u64, remote_addr: SocketAddr, router: Arc<Router>) -> Self {
        Self {
            id,
            remote_addr,
            public: PublicStore::new(),
            router,
            default_codec: Codec::default(),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Set the codec used when a header names none.
    pub fn with_default_codec(mut self, codec: Codec) -> Self {
        self.default_codec = codec;
        self
    }

    /// Session id, unique per peer.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Address of the remote end.
    #[inline]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Data shared by every exchange on this connection.
    ///
    /// Exchanges see a copy taken when their context is acquired.
    #[inline]
    pub fn public(&self) -> &PublicStore {
        &self.public
    }

    /// Router used to resolve handlers.
    #[inline]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Codec used when a header names none.
    #[inline]
    pub fn default_codec(&self) -> Codec {
        self.default_codec
    }

    /// Number of frames served so far.
    pub fn exchanges(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    /// Serve `stream` until the remote end closes it.
    ///
    /// # Errors
    ///
    /// - [`WirecallError::Protocol`] on a malformed or oversized frame
    /// - [`WirecallError::ConnectionClosed`] if the stream ends mid-frame
    /// - [`WirecallError::Io`] on read or write failure
    pub async fn serve<S>(
        self: Arc<Self>,
        mut stream: S,
        pool: Arc<ContextPool>,
        config: &PeerConfig,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut frame_buffer = FrameBuffer::with_limits(config.max_header_size, config.max_body_size);
        let mut buf = vec![0u8; config.read_buffer_size.max(1)];

        tracing::debug!("Session {} opened for {}", self.id, self.remote_addr);

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                if frame_buffer.has_partial() {
                    return Err(WirecallError::ConnectionClosed);
                }
                tracing::debug!(
                    "Session {} closed after {} exchanges",
                    self.id,
                    self.exchanges()
                );
                return Ok(());
            }

            let frames = frame_buffer.push(&buf[..n])?;
            if frames.is_empty() {
                continue;
            }

            for frame in frames {
                self.exchanges.fetch_add(1, Ordering::Relaxed);
                let reply = {
                    let mut ctx = pool.acquire(&self);
                    ctx.serve_frame(&frame)?
                };
                if let Some(reply) = reply {
                    stream.write_all(&reply.to_bytes()?).await?;
                }
            }
            stream.flush().await?;
        }
    }
}
