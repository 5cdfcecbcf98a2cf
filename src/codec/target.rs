//! Type-erased decode targets.
//!
//! A handler declares its argument type at registration. When a header is
//! routed, the handler allocates a zero-valued instance behind
//! `Box<dyn DecodeTarget>`; the packet layer decodes the body into it without
//! knowing the concrete type, and the handler downcasts it back.

use std::any::Any;

use serde::de::DeserializeOwned;

use super::Codec;
use crate::error::Result;

/// A value that a packet body can be decoded into.
///
/// Implemented for every `DeserializeOwned + Send + 'static` type.
pub trait DecodeTarget: Any + Send {
    /// Replace the value with one decoded from `bytes`.
    fn decode_from(&mut self, codec: Codec, bytes: &[u8]) -> Result<()>;

    /// Borrow as `Any` for inspection.
    fn as_any(&self) -> &dyn Any;

    /// Convert into `Any` for downcasting by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;
}

impl<T> DecodeTarget for T
where
    T: DeserializeOwned + Send + 'static,
{
    fn decode_from(&mut self, codec: Codec, bytes: &[u8]) -> Result<()> {
        *self = codec.decode(bytes)?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }
}
