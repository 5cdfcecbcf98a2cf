//! Router mapping packet kind and path to handler descriptors.
//!
//! A [`Handler`] is the routing metadata for one path: the argument type it
//! expects (as a factory producing a zero-valued decode target) and the code
//! to run. Pulls and pushes live in separate tables; replies never route.
//!
//! # Example
//!
//! ```ignore
//! use wirecall::handler::Router;
//!
//! #[derive(serde::Deserialize, Default)]
//! struct Add { a: i64, b: i64 }
//!
//! let mut router = Router::new();
//! router.pull("/math/add", |_ctx, args: Add| Ok(args.a + args.b));
//! router.push("/log", |_ctx, line: String| {
//!     tracing::info!("{}", line);
//!     Ok(())
//! });
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::address::Address;
use super::Context;
use crate::codec::DecodeTarget;
use crate::error::{Result, WirecallError};
use crate::protocol::{Header, PacketKind};

/// Trait for handler functions with an erased argument type.
pub trait HandlerFn: Send + Sync + 'static {
    /// Run the handler on a decoded argument, returning the encoded reply body.
    fn call(&self, ctx: &mut Context, arg: Box<dyn DecodeTarget>) -> Result<Bytes>;
}

/// Wrapper that downcasts the argument and encodes the reply.
pub struct TypedHandler<F, T, R>
where
    F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
    T: DeserializeOwned + Default + Send + 'static,
    R: Serialize + 'static,
{
    handler: F,
    _phantom: PhantomData<fn(T) -> R>,
}

impl<F, T, R> TypedHandler<F, T, R>
where
    F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
    T: DeserializeOwned + Default + Send + 'static,
    R: Serialize + 'static,
{
    /// Create a new typed handler.
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<F, T, R> HandlerFn for TypedHandler<F, T, R>
where
    F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
    T: DeserializeOwned + Default + Send + 'static,
    R: Serialize + 'static,
{
    fn call(&self, ctx: &mut Context, arg: Box<dyn DecodeTarget>) -> Result<Bytes> {
        let arg = arg
            .into_any()
            .downcast::<T>()
            .map_err(|_| WirecallError::ArgumentType)?;

        let reply = (self.handler)(ctx, *arg)?;
        ctx.encode_reply(&reply)
    }
}

fn zero_arg<T>() -> Box<dyn DecodeTarget>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    Box::new(T::default())
}

/// Routing metadata and code for one path.
pub struct Handler {
    path: String,
    kind: PacketKind,
    arg_type: &'static str,
    new_arg: fn() -> Box<dyn DecodeTarget>,
    func: Box<dyn HandlerFn>,
}

impl Handler {
    /// Build a descriptor for a typed handler function.
    pub fn new<F, T, R>(path: &str, kind: PacketKind, handler: F) -> Self
    where
        F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + 'static,
    {
        Self {
            path: path.to_string(),
            kind,
            arg_type: type_name::<T>(),
            new_arg: zero_arg::<T>,
            func: Box::new(TypedHandler::new(handler)),
        }
    }

    /// Registered path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Packet kind this handler serves.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Name of the declared argument type.
    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    /// Allocate a fresh, zero-valued argument.
    pub fn new_arg(&self) -> Box<dyn DecodeTarget> {
        (self.new_arg)()
    }

    /// Run the handler.
    pub fn call(&self, ctx: &mut Context, arg: Box<dyn DecodeTarget>) -> Result<Bytes> {
        self.func.call(ctx, arg)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("arg_type", &self.arg_type)
            .finish()
    }
}

/// Router mapping (kind, path) to handlers.
#[derive(Debug, Default)]
pub struct Router {
    pulls: HashMap<String, Arc<Handler>>,
    pushes: HashMap<String, Arc<Handler>>,
}

impl Router {
    /// Create a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pull handler; its return value becomes the reply body.
    pub fn pull<F, T, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + 'static,
    {
        self.insert(Handler::new(path, PacketKind::Pull, handler))
    }

    /// Register a push handler; its return value is dropped.
    pub fn push<F, T, R>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut Context, T) -> Result<R> + Send + Sync + 'static,
        T: DeserializeOwned + Default + Send + 'static,
        R: Serialize + 'static,
    {
        self.insert(Handler::new(path, PacketKind::Push, handler))
    }

    fn insert(&mut self, handler: Handler) -> &mut Self {
        let table = match handler.kind {
            PacketKind::Pull => &mut self.pulls,
            PacketKind::Push => &mut self.pushes,
            PacketKind::Reply => return self,
        };
        let path = handler.path.clone();
        if let Some(old) = table.insert(path, Arc::new(handler)) {
            tracing::warn!("Replaced existing {:?} handler for {}", old.kind, old.path);
        }
        self
    }

    /// Find the handler for a kind and decoded path.
    pub fn route(&self, kind: PacketKind, path: &str) -> Option<Arc<Handler>> {
        let table = match kind {
            PacketKind::Pull => &self.pulls,
            PacketKind::Push => &self.pushes,
            PacketKind::Reply => return None,
        };
        table.get(path).cloned()
    }

    /// Find the handler for a header, parsing its URI tolerantly.
    pub fn lookup(&self, header: &Header) -> Option<Arc<Handler>> {
        let address = Address::parse_or_default(&header.uri);
        self.route(header.kind, address.path())
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.pulls.len() + self.pushes.len()
    }

    /// Check if no handler is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Default, PartialEq, Debug)]
    struct Add {
        a: i64,
        b: i64,
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .pull("/math/add", |_ctx, args: Add| Ok(args.a + args.b))
            .push("/log", |_ctx, _line: String| Ok(()));
        router
    }

    #[test]
    fn test_route_by_kind() {
        let router = router();

        assert!(router.route(PacketKind::Pull, "/math/add").is_some());
        assert!(router.route(PacketKind::Push, "/math/add").is_none());
        assert!(router.route(PacketKind::Push, "/log").is_some());
        assert!(router.route(PacketKind::Reply, "/log").is_none());
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_lookup_uses_decoded_path() {
        let router = router();

        let header = Header::new(1, PacketKind::Pull, "/math/add?precision=2");
        let handler = router.lookup(&header).unwrap();

        assert_eq!(handler.path(), "/math/add");
        assert_eq!(handler.kind(), PacketKind::Pull);
    }

    #[test]
    fn test_lookup_malformed_uri_finds_nothing() {
        let router = router();
        let header = Header::new(1, PacketKind::Pull, "/math/add?x=%zz");
        assert!(router.lookup(&header).is_none());
    }

    #[test]
    fn test_new_arg_is_fresh_zero_value() {
        let router = router();
        let handler = router.route(PacketKind::Pull, "/math/add").unwrap();

        let mut first = handler.new_arg();
        first
            .decode_from(crate::codec::Codec::Json, br#"{"a":1,"b":2}"#)
            .unwrap();
        let second = handler.new_arg();

        assert_eq!(second.as_any().downcast_ref::<Add>(), Some(&Add::default()));
        assert!(handler.arg_type().ends_with("Add"));
    }

    #[test]
    fn test_register_replaces() {
        let mut router = Router::new();
        router.pull("/a", |_ctx, _: ()| Ok(1));
        router.pull("/a", |_ctx, _: ()| Ok(2));
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_empty_router() {
        let router = Router::new();
        assert!(router.is_empty());
        assert!(router
            .lookup(&Header::new(1, PacketKind::Pull, "/anything"))
            .is_none());
    }
}
