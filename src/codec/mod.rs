//! Codec module - payload serialization selected by name.
//!
//! Every packet header carries a codec name. The name picks one of:
//!
//! - [`JsonCodec`] - `"json"`, the default
//! - [`MsgPackCodec`] - `"msgpack"`, MessagePack via `rmp-serde` (struct-as-map)
//!
//! Headers themselves are always MessagePack; the name only governs bodies.
//!
//! # Example
//!
//! ```
//! use wirecall::codec::Codec;
//!
//! let codec = Codec::from_name("msgpack").unwrap();
//! let encoded = codec.encode(&vec![1, 2, 3]).unwrap();
//! let decoded: Vec<i32> = codec.decode(&encoded).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//!
//! assert!(Codec::from_name("proto").is_none());
//! ```

mod json;
mod msgpack;
mod target;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use target::DecodeTarget;

/// Body codec, selected by the name carried in a packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    /// JSON via `serde_json`.
    #[default]
    Json,
    /// MessagePack via `rmp-serde`.
    MsgPack,
}

impl Codec {
    /// Look up a codec by its wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "json" => Some(Self::Json),
            "msgpack" => Some(Self::MsgPack),
            _ => None,
        }
    }

    /// Resolve a header's codec name, falling back to `default` when empty.
    pub fn resolve(name: &str, default: Codec) -> Option<Self> {
        if name.is_empty() {
            Some(default)
        } else {
            Self::from_name(name)
        }
    }

    /// The wire name of this codec.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MsgPack => "msgpack",
        }
    }

    /// Encode a value with this codec.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        match self {
            Self::Json => JsonCodec::encode(value),
            Self::MsgPack => MsgPackCodec::encode(value),
        }
    }

    /// Decode bytes with this codec.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        match self {
            Self::Json => JsonCodec::decode(bytes),
            Self::MsgPack => MsgPackCodec::decode(bytes),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Codec::from_name("json"), Some(Codec::Json));
        assert_eq!(Codec::from_name("msgpack"), Some(Codec::MsgPack));
        assert_eq!(Codec::from_name("JSON"), None);
        assert_eq!(Codec::from_name(""), None);
    }

    #[test]
    fn test_resolve_empty_uses_default() {
        assert_eq!(Codec::resolve("", Codec::MsgPack), Some(Codec::MsgPack));
        assert_eq!(Codec::resolve("json", Codec::MsgPack), Some(Codec::Json));
        assert_eq!(Codec::resolve("proto", Codec::Json), None);
    }

    #[test]
    fn test_name_matches_from_name() {
        for codec in [Codec::Json, Codec::MsgPack] {
            assert_eq!(Codec::from_name(codec.name()), Some(codec));
            assert_eq!(codec.to_string(), codec.name());
        }
    }

    #[test]
    fn test_default_is_json() {
        assert_eq!(Codec::default(), Codec::Json);
    }
}
