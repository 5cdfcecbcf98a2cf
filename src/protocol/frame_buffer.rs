//! Frame buffer for accumulating partial reads.
//!
//! Uses `bytes::BytesMut` for zero-copy buffer management.
//! Implements a state machine for handling fragmented frames:
//! - `WaitingForPrefix`: Need at least 8 bytes
//! - `WaitingForParts`: Prefix parsed, need header + body bytes
//!
//! # Example
//!
//! ```ignore
//! use wirecall::protocol::FrameBuffer;
//!
//! let mut buffer = FrameBuffer::new();
//!
//! // Data arrives in chunks from the socket
//! let frames = buffer.push(&chunk)?;
//! for frame in frames {
//!     println!("Got frame with {} body bytes", frame.body.len());
//! }
//! ```

use bytes::BytesMut;

use super::wire_format::{
    decode_prefix, DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE, FRAME_PREFIX_SIZE,
};
use super::Frame;
use crate::error::{Result, WirecallError};

/// Default initial buffer capacity (64 KB).
const DEFAULT_CAPACITY: usize = 64 * 1024;

/// State machine for frame parsing.
#[derive(Debug, Clone, Copy)]
enum State {
    /// Waiting for the complete 8-byte prefix.
    WaitingForPrefix,
    /// Prefix parsed, waiting for header and body bytes.
    WaitingForParts { header_len: usize, body_len: usize },
}

/// Buffer for accumulating incoming bytes and extracting complete frames.
pub struct FrameBuffer {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: State,
    /// Maximum allowed encoded header size.
    max_header_size: u32,
    /// Maximum allowed body size.
    max_body_size: u32,
}

impl FrameBuffer {
    /// Create a new frame buffer with default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_HEADER_SIZE, DEFAULT_MAX_BODY_SIZE)
    }

    /// Create a new frame buffer with custom size limits.
    pub fn with_limits(max_header_size: u32, max_body_size: u32) -> Self {
        Self {
            buffer: BytesMut::with_capacity(DEFAULT_CAPACITY),
            state: State::WaitingForPrefix,
            max_header_size,
            max_body_size,
        }
    }

    /// Push data into the buffer and extract all complete frames.
    ///
    /// Partial data is buffered internally for the next push.
    ///
    /// # Errors
    ///
    /// Returns error if a prefix announces a header or body above the limits.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.buffer.extend_from_slice(data);

        let mut frames = Vec::new();
        while let Some(frame) = self.try_extract_one()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Try to extract a single frame from the buffer.
    fn try_extract_one(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                State::WaitingForPrefix => {
                    let Some((header_len, body_len)) = decode_prefix(&self.buffer) else {
                        return Ok(None);
                    };

                    if header_len == 0 {
                        return Err(WirecallError::Protocol(
                            "Frame header must not be empty".to_string(),
                        ));
                    }
                    if header_len > self.max_header_size {
                        return Err(WirecallError::Protocol(format!(
                            "Header size {} exceeds maximum {}",
                            header_len, self.max_header_size
                        )));
                    }
                    if body_len > self.max_body_size {
                        return Err(WirecallError::Protocol(format!(
                            "Body size {} exceeds maximum {}",
                            body_len, self.max_body_size
                        )));
                    }

                    let _ = self.buffer.split_to(FRAME_PREFIX_SIZE);
                    self.state = State::WaitingForParts {
                        header_len: header_len as usize,
                        body_len: body_len as usize,
                    };
                }

                State::WaitingForParts {
                    header_len,
                    body_len,
                } => {
                    if self.buffer.len() < header_len + body_len {
                        return Ok(None);
                    }

                    let header = self.buffer.split_to(header_len).freeze();
                    let body = self.buffer.split_to(body_len).freeze();
                    self.state = State::WaitingForPrefix;

                    return Ok(Some(Frame::new(header, body)));
                }
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Check if a frame is partially buffered.
    pub fn has_partial(&self) -> bool {
        !self.buffer.is_empty() || matches!(self.state, State::WaitingForParts { .. })
    }

    /// Clear the buffer and reset state.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.state = State::WaitingForPrefix;
    }

    #[cfg(test)]
    fn state_name(&self) -> &'static str {
        match self.state {
            State::WaitingForPrefix => "WaitingForPrefix",
            State::WaitingForParts { .. } => "WaitingForParts",
        }
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::encode_prefix;
    use crate::protocol::{build_frame, Header, PacketKind};

    fn make_frame_bytes(seq: u32, uri: &str, body: &[u8]) -> Vec<u8> {
        build_frame(&Header::new(seq, PacketKind::Pull, uri), body).unwrap()
    }

    #[test]
    fn test_single_complete_frame() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(42, "/echo", b"hello");

        let frames = buffer.push(&bytes).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].decode_header().unwrap().seq, 42);
        assert_eq!(frames[0].body(), b"hello");
        assert!(buffer.is_empty());
        assert!(!buffer.has_partial());
    }

    #[test]
    fn test_multiple_frames_in_one_push() {
        let mut buffer = FrameBuffer::new();

        let mut combined = make_frame_bytes(1, "/a", b"first");
        combined.extend(make_frame_bytes(2, "/b", b"second"));
        combined.extend(make_frame_bytes(3, "/c", b""));

        let frames = buffer.push(&combined).unwrap();

        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1].decode_header().unwrap().uri, "/b");
        assert_eq!(frames[1].body(), b"second");
        assert!(frames[2].body().is_empty());
    }

    #[test]
    fn test_fragmented_prefix() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, "/a", b"test");

        assert!(buffer.push(&bytes[..5]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForPrefix");
        assert!(buffer.has_partial());

        let frames = buffer.push(&bytes[5..]).unwrap();
        assert_eq!(frames.len(), 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_fragmented_body() {
        let mut buffer = FrameBuffer::new();
        let body = b"this is a longer body that will be fragmented";
        let bytes = make_frame_bytes(1, "/a", body);

        let split = bytes.len() - 10;
        assert!(buffer.push(&bytes[..split]).unwrap().is_empty());
        assert_eq!(buffer.state_name(), "WaitingForParts");

        let frames = buffer.push(&bytes[split..]).unwrap();
        assert_eq!(frames[0].body(), body);
    }

    #[test]
    fn test_byte_at_a_time() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(7, "/slow", b"hi");

        let mut all = Vec::new();
        for byte in &bytes {
            all.extend(buffer.push(&[*byte]).unwrap());
        }

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].decode_header().unwrap().seq, 7);
        assert_eq!(all[0].body(), b"hi");
    }

    #[test]
    fn test_max_body_validation() {
        let mut buffer = FrameBuffer::with_limits(1024, 100);
        let result = buffer.push(&encode_prefix(10, 1000));

        assert!(result.unwrap_err().to_string().contains("Body size 1000"));
    }

    #[test]
    fn test_max_header_validation() {
        let mut buffer = FrameBuffer::with_limits(16, 100);
        let result = buffer.push(&encode_prefix(17, 0));

        assert!(result.unwrap_err().to_string().contains("Header size 17"));
    }

    #[test]
    fn test_empty_header_rejected() {
        let mut buffer = FrameBuffer::new();
        assert!(buffer.push(&encode_prefix(0, 0)).is_err());
    }

    #[test]
    fn test_clear_resets_state() {
        let mut buffer = FrameBuffer::new();
        let bytes = make_frame_bytes(1, "/a", b"test");

        buffer.push(&bytes[..FRAME_PREFIX_SIZE + 1]).unwrap();
        assert_eq!(buffer.state_name(), "WaitingForParts");

        buffer.clear();

        assert_eq!(buffer.state_name(), "WaitingForPrefix");
        assert!(buffer.is_empty());
    }
}
