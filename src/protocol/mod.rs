//! Protocol module - wire format, framing, and packet assembly.
//!
//! This module implements the transport side of an exchange:
//! - 8-byte length prefix encoding/decoding
//! - MsgPack-encoded [`Header`] with packet kind, URI, codec and status
//! - [`FrameBuffer`] for accumulating partial reads
//! - [`unmarshal`], which hands the decoded header to a [`BodyLoader`]
//!   before decoding the body

mod frame;
mod frame_buffer;
mod packet;
mod wire_format;

pub use frame::{build_frame, Frame};
pub use frame_buffer::FrameBuffer;
pub use packet::{unmarshal, BodyLoader, BodyState, LoadBody, Packet};
pub use wire_format::{
    decode_prefix, encode_prefix, status, Header, PacketKind, DEFAULT_MAX_BODY_SIZE,
    DEFAULT_MAX_HEADER_SIZE, FRAME_PREFIX_SIZE,
};
