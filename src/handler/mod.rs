//! Handler module - request context, addressing and routing.
//!
//! Provides:
//! - [`Context`] - per-exchange state handed to handler code
//! - [`Router`] - maps packet kind and path to [`Handler`] descriptors
//! - [`Address`] - tolerant URI → path/query parsing
//!
//! # Example
//!
//! ```ignore
//! use wirecall::handler::{Context, Router};
//!
//! let mut router = Router::new();
//!
//! // Pull: the return value is the reply body
//! router.pull("/echo", |_ctx: &mut Context, text: String| Ok(text));
//!
//! // Push: no reply is sent
//! router.push("/audit", |ctx: &mut Context, event: String| {
//!     tracing::info!("{} from {}", event, ctx.ip());
//!     Ok(())
//! });
//! ```

mod address;
mod context;
mod router;

pub use address::{Address, AddressError, QueryValues};
pub use context::Context;
pub use router::{Handler, HandlerFn, Router, TypedHandler};
