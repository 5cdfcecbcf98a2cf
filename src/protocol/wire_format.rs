//! Wire format encoding and decoding.
//!
//! Every frame is a fixed 8-byte prefix followed by the encoded header and
//! the body:
//! ```text
//! ┌────────────┬────────────┬──────────────────┬──────────────┐
//! │ Header len │ Body len   │ Header           │ Body         │
//! │ 4 bytes    │ 4 bytes    │ MsgPack map      │ header.codec │
//! │ uint32 BE  │ uint32 BE  │                  │              │
//! └────────────┴────────────┴──────────────────┴──────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use serde::{Deserialize, Serialize};

use crate::codec::MsgPackCodec;
use crate::error::{Result, WirecallError};

/// Frame prefix size in bytes (fixed, exactly 8).
pub const FRAME_PREFIX_SIZE: usize = 8;

/// Default maximum encoded header size (64 KB).
pub const DEFAULT_MAX_HEADER_SIZE: u32 = 64 * 1024;

/// Default maximum body size (64 MB).
pub const DEFAULT_MAX_BODY_SIZE: u32 = 64 * 1024 * 1024;

/// Status codes carried by reply headers.
pub mod status {
    /// Handler ran and produced a body.
    pub const OK: u16 = 200;
    /// Body could not be decoded into the handler's argument.
    pub const BAD_REQUEST: u16 = 400;
    /// No handler matched the packet's path.
    pub const NOT_FOUND: u16 = 404;
    /// Reply codec name is not known.
    pub const UNSUPPORTED_CODEC: u16 = 415;
    /// Handler returned an error.
    pub const HANDLER_ERROR: u16 = 500;

    /// Check if a status code denotes success.
    #[inline]
    pub fn is_ok(code: u16) -> bool {
        (200..300).contains(&code)
    }
}

/// What a packet asks of the receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    /// Request that expects a reply.
    #[default]
    Pull,
    /// Reply to a pull.
    Reply,
    /// One-way request, no reply.
    Push,
}

/// Packet header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    /// Sequence number, echoed by the reply.
    pub seq: u32,
    /// Packet kind.
    pub kind: PacketKind,
    /// Request address, e.g. `/users?id=42`.
    pub uri: String,
    /// Body codec name; empty means the receiver's default.
    pub codec: String,
    /// Reply status code (0 on requests).
    pub status_code: u16,
    /// Reply status text.
    pub status: String,
}

impl Header {
    /// Create a request header.
    pub fn new(seq: u32, kind: PacketKind, uri: impl Into<String>) -> Self {
        Self {
            seq,
            kind,
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Builder-style codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Encode the header as a MsgPack map.
    pub fn encode(&self) -> Result<Vec<u8>> {
        MsgPackCodec::encode(self)
    }

    /// Decode a header.
    ///
    /// An undecodable header is a framing error.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        MsgPackCodec::decode(buf)
            .map_err(|e| WirecallError::Protocol(format!("Invalid header: {}", e)))
    }

    /// Reset every field, keeping string capacity.
    pub fn clear(&mut self) {
        self.seq = 0;
        self.kind = PacketKind::default();
        self.uri.clear();
        self.codec.clear();
        self.status_code = 0;
        self.status.clear();
    }

    /// Check if this is a pull.
    #[inline]
    pub fn is_pull(&self) -> bool {
        self.kind == PacketKind::Pull
    }

    /// Check if this is a push.
    #[inline]
    pub fn is_push(&self) -> bool {
        self.kind == PacketKind::Push
    }

    /// Check if this is a reply.
    #[inline]
    pub fn is_reply(&self) -> bool {
        self.kind == PacketKind::Reply
    }
}

/// Encode the frame prefix.
pub fn encode_prefix(header_len: u32, body_len: u32) -> [u8; FRAME_PREFIX_SIZE] {
    let mut buf = [0u8; FRAME_PREFIX_SIZE];
    buf[0..4].copy_from_slice(&header_len.to_be_bytes());
    buf[4..8].copy_from_slice(&body_len.to_be_bytes());
    buf
}

/// Decode the frame prefix into `(header_len, body_len)`.
///
/// Returns `None` if the buffer is too short.
pub fn decode_prefix(buf: &[u8]) -> Option<(u32, u32)> {
    if buf.len() < FRAME_PREFIX_SIZE {
        return None;
    }
    Some((
        u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
        u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
    ))
}
