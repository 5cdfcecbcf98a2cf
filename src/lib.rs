//! # wirecall
//!
//! Request context, pooling and routing for a framed RPC runtime.
//!
//! Every request/response exchange runs against a [`Context`] taken from a
//! [`ContextPool`]. The context carries the inbound and outbound packets, a
//! private copy of the connection's public data and a lazily parsed view of
//! the request URI. It also decides where a request body is decoded: once
//! the header is read, the router resolves a handler and the body is decoded
//! straight into that handler's argument type.
//!
//! ## Wire format
//!
//! - 8-byte prefix: header length and body length, both `u32` big-endian
//! - MessagePack header: sequence, kind (`pull`/`push`/`reply`), URI, codec, status
//! - Body encoded with the codec the header names (`json` or `msgpack`)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use wirecall::Peer;
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Add {
//!     a: i64,
//!     b: i64,
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let peer = Peer::builder()
//!         .pull("/math/add", |_ctx, args: Add| Ok(args.a + args.b))
//!         .pull("/users", |ctx, _: ()| {
//!             ctx.set_codec("msgpack");
//!             Ok(ctx.query().get("id").cloned().unwrap_or_default())
//!         })
//!         .build();
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:7070").await.unwrap();
//!     Arc::new(peer).serve(listener).await.unwrap();
//! }
//! ```

pub mod codec;
pub mod error;
pub mod handler;
pub mod peer;
pub mod pool;
pub mod protocol;
pub mod scope;
pub mod session;

pub use codec::Codec;
pub use error::{Result, WirecallError};
pub use handler::{Address, Context, Router};
pub use peer::{Peer, PeerBuilder, PeerConfig};
pub use pool::{ContextPool, PoolConfig, PooledContext};
pub use scope::{PublicStore, Scope};
pub use session::Session;
