//! Raw frames and frame building.
//!
//! A [`Frame`] is a complete frame split into its still-encoded header and
//! body. Decoding the header and routing the body is the job of
//! [`unmarshal`](super::unmarshal); the frame itself only carries bytes.
//!
//! # Example
//!
//! ```
//! use wirecall::protocol::{build_frame, FrameBuffer, Header, PacketKind};
//!
//! let header = Header::new(1, PacketKind::Pull, "/echo").with_codec("json");
//! let bytes = build_frame(&header, br#""hi""#).unwrap();
//!
//! let mut buffer = FrameBuffer::new();
//! let frames = buffer.push(&bytes).unwrap();
//! assert_eq!(frames[0].body(), br#""hi""#);
//! ```

use bytes::Bytes;

use super::wire_format::{encode_prefix, Header, FRAME_PREFIX_SIZE};
use crate::error::{Result, WirecallError};

/// A complete frame with encoded header and body.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Encoded header bytes.
    pub header: Bytes,
    /// Body bytes (zero-copy via `bytes::Bytes`).
    pub body: Bytes,
}

impl Frame {
    /// Create a new frame from its parts.
    pub fn new(header: Bytes, body: Bytes) -> Self {
        Self { header, body }
    }

    /// Encode `header` and pair it with `body`.
    pub fn from_header(header: &Header, body: Bytes) -> Result<Self> {
        Ok(Self {
            header: Bytes::from(header.encode()?),
            body,
        })
    }

    /// Get a reference to the body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Decode the header.
    pub fn decode_header(&self) -> Result<Header> {
        Header::decode(&self.header)
    }

    /// Total wire size (prefix + header + body).
    #[inline]
    pub fn wire_len(&self) -> usize {
        FRAME_PREFIX_SIZE + self.header.len() + self.body.len()
    }

    /// Serialize the frame, prefix included.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let header_len = wire_len_u32(self.header.len(), "Header")?;
        let body_len = wire_len_u32(self.body.len(), "Body")?;

        let mut buf = Vec::with_capacity(self.wire_len());
        buf.extend_from_slice(&encode_prefix(header_len, body_len));
        buf.extend_from_slice(&self.header);
        buf.extend_from_slice(&self.body);
        Ok(buf)
    }
}

/// Build a complete frame as a single byte vector.
pub fn build_frame(header: &Header, body: &[u8]) -> Result<Vec<u8>> {
    Frame::from_header(header, Bytes::copy_from_slice(body))?.to_bytes()
}

fn wire_len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| WirecallError::Protocol(format!("{} length {} exceeds u32", what, len)))
}
