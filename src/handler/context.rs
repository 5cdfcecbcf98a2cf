//! Per-exchange context.
//!
//! A [`Context`] is the scratch object for one request/response exchange. It
//! is owned by a [`ContextPool`](crate::pool::ContextPool) and only ever seen
//! through a [`PooledContext`](crate::pool::PooledContext) guard, after a
//! reset against the session that received the request.
//!
//! It gives handler code:
//! - the raw URI and its lazily parsed path and query (`uri`, `path`, `query`)
//! - a private copy of the session's public data (`public`, `public_mut`)
//! - control over the reply codec (`set_codec`)
//! - the peer address (`ip`)
//!
//! It is also the [`BodyLoader`] the packet layer calls once a header is
//! decoded: routing happens there, and the matched handler's argument is
//! allocated before any body byte is decoded.
//!
//! # Example
//!
//! ```ignore
//! router.pull("/users", |ctx: &mut Context, _: ()| {
//!     let id = ctx.query().get("id").cloned().unwrap_or_default();
//!     ctx.set_codec("msgpack");
//!     Ok(id)
//! });
//! ```

use std::cell::OnceCell;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use super::address::{Address, QueryValues};
use super::router::Handler;
use crate::codec::{Codec, DecodeTarget};
use crate::error::{Result, WirecallError};
use crate::protocol::{
    status, unmarshal, BodyLoader, BodyState, Frame, Header, LoadBody, Packet, PacketKind,
};
use crate::scope::Scope;
use crate::session::Session;

/// Context for a single exchange.
///
/// # Panics
///
/// Accessors that need the session panic if called on a context that is not
/// bound to one. Contexts handed out by the pool are always bound.
pub struct Context {
    /// Pool slot, stable across reuse.
    slot: u64,
    /// Session that owns the current exchange.
    session: Option<Arc<Session>>,
    /// Private copy of the session's public data.
    scope: Scope,
    /// Handler resolved by the body-loading hook.
    handler: Option<Arc<Handler>>,
    /// Argument allocated by the hook, decoded from the body.
    body: Option<Box<dyn DecodeTarget>>,
    /// Inbound packet.
    input: Packet,
    /// Outbound packet.
    output: Packet,
    /// Parsed `input.header.uri`, computed on first use.
    address: OnceCell<Address>,
}

impl Context {
    pub(crate) fn new(slot: u64) -> Self {
        Self {
            slot,
            session: None,
            scope: Scope::new(),
            handler: None,
            body: None,
            input: Packet::default(),
            output: Packet::default(),
            address: OnceCell::new(),
        }
    }

    /// Rebind to `session` for a new exchange.
    pub(crate) fn reset(&mut self, session: &Arc<Session>) {
        self.scope.clear();
        session.public().copy_into(&mut self.scope);
        self.session = Some(Arc::clone(session));
        self.handler = None;
        self.body = None;
        self.input.reset();
        self.output.reset();
        self.address.take();
    }

    /// Drop every reference held for the finished exchange.
    pub(crate) fn free(&mut self) {
        self.session = None;
        self.scope.clear();
        self.handler = None;
        self.body = None;
        self.input.reset();
        self.output.reset();
        self.address.take();
    }

    /// Pool slot of this context.
    #[inline]
    pub fn slot(&self) -> u64 {
        self.slot
    }

    /// Check if the context is bound to a session.
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.session.is_some()
    }

    /// Session that owns this exchange.
    pub fn session(&self) -> &Arc<Session> {
        match &self.session {
            Some(session) => session,
            None => panic!("context slot {} used while not bound to a session", self.slot),
        }
    }

    /// Raw request URI, verbatim from the inbound header.
    #[inline]
    pub fn uri(&self) -> &str {
        &self.input.header.uri
    }

    fn address(&self) -> &Address {
        self.address
            .get_or_init(|| Address::parse_or_default(&self.input.header.uri))
    }

    /// Decoded request path; empty if the URI is malformed.
    pub fn path(&self) -> &str {
        self.address().path()
    }

    /// Decoded query parameters; empty if the URI is malformed.
    pub fn query(&self) -> &QueryValues {
        self.address().query()
    }

    /// Exchange-private copy of the session's public data.
    #[inline]
    pub fn public(&self) -> &Scope {
        &self.scope
    }

    /// Mutable access to the exchange-private copy.
    ///
    /// Writes never reach the session's store.
    #[inline]
    pub fn public_mut(&mut self) -> &mut Scope {
        &mut self.scope
    }

    /// Number of entries in the exchange-private copy.
    #[inline]
    pub fn public_len(&self) -> usize {
        self.scope.len()
    }

    /// Choose the reply codec by name. Last call wins.
    ///
    /// The name is checked only when the reply is encoded.
    pub fn set_codec(&mut self, name: &str) {
        self.output.header.codec.clear();
        self.output.header.codec.push_str(name);
    }

    /// Remote peer address, e.g. `127.0.0.1:50312`.
    pub fn ip(&self) -> String {
        self.session().remote_addr().to_string()
    }

    /// Sequence number of the inbound packet.
    #[inline]
    pub fn seq(&self) -> u32 {
        self.input.header.seq
    }

    /// Kind of the inbound packet.
    #[inline]
    pub fn kind(&self) -> PacketKind {
        self.input.header.kind
    }

    /// Inbound header.
    #[inline]
    pub fn input(&self) -> &Header {
        &self.input.header
    }

    /// Raw inbound body bytes.
    #[inline]
    pub fn input_body(&self) -> &[u8] {
        &self.input.body
    }

    /// Outbound header.
    #[inline]
    pub fn output(&self) -> &Header {
        &self.output.header
    }

    /// Handler resolved for this exchange, if any.
    #[inline]
    pub fn handler(&self) -> Option<&Arc<Handler>> {
        self.handler.as_ref()
    }

    /// Decoded argument, until the handler takes it.
    pub fn body(&self) -> Option<&dyn DecodeTarget> {
        self.body.as_deref()
    }

    /// Codec the reply will be encoded with.
    ///
    /// Resolution order: [`set_codec`](Self::set_codec), the request's codec,
    /// the session default.
    pub fn reply_codec(&self) -> Result<Codec> {
        let name = if self.output.header.codec.is_empty() {
            &self.input.header.codec
        } else {
            &self.output.header.codec
        };
        Codec::resolve(name, self.session().default_codec())
            .ok_or_else(|| WirecallError::UnsupportedCodec(name.clone()))
    }

    /// Encode a handler's return value with the reply codec.
    pub(crate) fn encode_reply<R: Serialize + ?Sized>(&mut self, reply: &R) -> Result<Bytes> {
        let codec = self.reply_codec()?;
        let body = codec.encode(reply)?;
        if self.output.header.codec.is_empty() {
            self.output.header.codec.push_str(codec.name());
        }
        Ok(Bytes::from(body))
    }

    /// Decode `frame`, run its handler and build the reply, if one is due.
    ///
    /// # Errors
    ///
    /// Only framing errors are returned; they should close the connection.
    /// Everything else becomes a reply status (pulls) or a log line (pushes).
    pub fn serve_frame(&mut self, frame: &Frame) -> Result<Option<Frame>> {
        let default_codec = self.session().default_codec();
        let state = match unmarshal(frame, default_codec, self) {
            Err(e @ WirecallError::Protocol(_)) => return Err(e),
            other => other,
        };
        self.input.body = frame.body.clone();

        match self.input.header.kind {
            PacketKind::Pull => self.reply(state).map(Some),
            PacketKind::Push => {
                self.finish_push(state);
                Ok(None)
            }
            PacketKind::Reply => {
                tracing::warn!(
                    "Discarding unexpected reply seq {} for {}",
                    self.seq(),
                    self.uri()
                );
                Ok(None)
            }
        }
    }

    /// Run the resolved handler on the decoded argument.
    fn run_handler(&mut self) -> Result<Bytes> {
        let (Some(handler), Some(arg)) = (self.handler.clone(), self.body.take()) else {
            return Err(WirecallError::HandlerNotFound(self.path().to_string()));
        };
        handler.call(self, arg)
    }

    fn reply(&mut self, state: Result<BodyState>) -> Result<Frame> {
        let (code, text, body) = match state.and_then(|_| self.run_handler()) {
            Ok(body) => (status::OK, "OK".to_string(), body),
            Err(e) => {
                let code = status_code(&e);
                if code == status::HANDLER_ERROR {
                    tracing::warn!("Handler error for {}: {}", self.uri(), e);
                }
                (code, e.to_string(), Bytes::new())
            }
        };

        let out = &mut self.output.header;
        out.seq = self.input.header.seq;
        out.kind = PacketKind::Reply;
        out.uri.clone_from(&self.input.header.uri);
        out.status_code = code;
        out.status = text;
        self.output.body = body;

        Frame::from_header(&self.output.header, self.output.body.clone())
    }

    fn finish_push(&mut self, state: Result<BodyState>) {
        match state.and_then(|_| self.run_handler()) {
            Ok(_) => {}
            Err(WirecallError::HandlerNotFound(path)) => {
                tracing::debug!("Discarding push for unknown path {:?}", path);
            }
            Err(e) => tracing::warn!("Push handler error for {}: {}", self.uri(), e),
        }
    }
}

/// Reply status for an exchange error.
fn status_code(err: &WirecallError) -> u16 {
    match err {
        WirecallError::BodyDecode(_) => status::BAD_REQUEST,
        WirecallError::HandlerNotFound(_) => status::NOT_FOUND,
        WirecallError::UnsupportedCodec(_) => status::UNSUPPORTED_CODEC,
        _ => status::HANDLER_ERROR,
    }
}

impl BodyLoader for Context {
    fn load_body(&mut self, header: Header) -> LoadBody<'_> {
        self.input.header = header;
        self.address.take();
        debug_assert!(self.handler.is_none(), "handler resolved twice in one exchange");

        let Some(session) = self.session.clone() else {
            return LoadBody::Discard;
        };
        let Some(handler) = session.router().route(self.input.header.kind, self.path()) else {
            tracing::trace!(
                "No {:?} route for {:?}",
                self.input.header.kind,
                self.input.header.uri
            );
            return LoadBody::Discard;
        };

        let arg = handler.new_arg();
        self.handler = Some(handler);
        LoadBody::Target(&mut **self.body.insert(arg))
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("slot", &self.slot)
            .field("bound", &self.is_bound())
            .field("input", &self.input.header)
            .field("output", &self.output.header)
            .field("handler", &self.handler)
            .finish()
    }
}
