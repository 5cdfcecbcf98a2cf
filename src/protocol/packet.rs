//! Packet assembly and the body-loading hook.
//!
//! Decoding a packet happens in two steps. The header is decoded first and
//! handed to a [`BodyLoader`], which decides where the body goes before any
//! body byte is looked at. Only then is the body decoded, into the target the
//! loader returned, or dropped when it returned [`LoadBody::Discard`].

use bytes::Bytes;

use super::wire_format::Header;
use super::Frame;
use crate::codec::{Codec, DecodeTarget};
use crate::error::{Result, WirecallError};

/// A packet bound to an exchange: its header and raw body bytes.
#[derive(Debug, Default)]
pub struct Packet {
    /// Packet header.
    pub header: Header,
    /// Raw body bytes.
    pub body: Bytes,
}

impl Packet {
    /// Detach the packet from its exchange, keeping header string capacity.
    pub fn reset(&mut self) {
        self.header.clear();
        self.body = Bytes::new();
    }

    /// Check if the packet carries nothing.
    pub fn is_detached(&self) -> bool {
        self.header == Header::default() && self.body.is_empty()
    }
}

/// Where a packet body should be decoded to.
pub enum LoadBody<'a> {
    /// Decode into this value.
    Target(&'a mut dyn DecodeTarget),
    /// No receiver; skip the body.
    Discard,
}

impl LoadBody<'_> {
    /// Check if a target was provided.
    pub fn is_target(&self) -> bool {
        matches!(self, Self::Target(_))
    }
}

/// Hook invoked once a header is decoded and before its body is.
///
/// Implementations must not block.
pub trait BodyLoader {
    /// Take ownership of the header and return the body's decode target.
    fn load_body(&mut self, header: Header) -> LoadBody<'_>;
}

/// Outcome of [`unmarshal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// The body was decoded into the loader's target.
    Decoded,
    /// A target was provided but the body was empty; the target keeps its zero value.
    Empty,
    /// The loader returned no target; the body was skipped.
    Discarded,
}

/// Decode `frame`, routing its body through `loader`.
///
/// # Errors
///
/// - [`WirecallError::Protocol`] if the header cannot be decoded (fatal to the connection)
/// - [`WirecallError::UnsupportedCodec`] if the header names an unknown codec
/// - [`WirecallError::BodyDecode`] if the body does not fit the target
pub fn unmarshal<L>(frame: &Frame, default_codec: Codec, loader: &mut L) -> Result<BodyState>
where
    L: BodyLoader + ?Sized,
{
    let header = frame.decode_header()?;
    let codec = Codec::resolve(&header.codec, default_codec)
        .ok_or_else(|| WirecallError::UnsupportedCodec(header.codec.clone()));

    match loader.load_body(header) {
        LoadBody::Target(_) if frame.body.is_empty() => Ok(BodyState::Empty),
        LoadBody::Target(target) => {
            target
                .decode_from(codec?, &frame.body)
                .map_err(|e| WirecallError::BodyDecode(e.to_string()))?;
            Ok(BodyState::Decoded)
        }
        LoadBody::Discard => Ok(BodyState::Discarded),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PacketKind;
    use serde::Deserialize;

    #[derive(Deserialize, Default, PartialEq, Debug)]
    struct Args {
        a: i32,
    }

    /// Loader that accepts only one path.
    #[derive(Default)]
    struct OnePath {
        seen: Option<Header>,
        target: Option<Box<dyn DecodeTarget>>,
    }

    impl BodyLoader for OnePath {
        fn load_body(&mut self, header: Header) -> LoadBody<'_> {
            let matched = header.uri == "/add";
            self.seen = Some(header);
            if !matched {
                return LoadBody::Discard;
            }
            LoadBody::Target(&mut **self.target.insert(Box::new(Args::default())))
        }
    }

    fn frame(uri: &str, codec: &str, body: &[u8]) -> Frame {
        let header = Header::new(1, PacketKind::Pull, uri).with_codec(codec);
        Frame::from_header(&header, Bytes::copy_from_slice(body)).unwrap()
    }

    fn decoded(loader: &OnePath) -> Option<&Args> {
        loader.target.as_ref()?.as_any().downcast_ref::<Args>()
    }

    #[test]
    fn test_body_decoded_into_target() {
        let mut loader = OnePath::default();

        let state = unmarshal(&frame("/add", "json", br#"{"a":3}"#), Codec::Json, &mut loader);

        assert_eq!(state.unwrap(), BodyState::Decoded);
        assert_eq!(decoded(&loader), Some(&Args { a: 3 }));
        assert_eq!(loader.seen.unwrap().uri, "/add");
    }

    #[test]
    fn test_empty_codec_uses_default() {
        let mut loader = OnePath::default();
        let body = crate::codec::MsgPackCodec::encode(&serde_json::json!({"a": 9})).unwrap();

        let state = unmarshal(&frame("/add", "", &body), Codec::MsgPack, &mut loader);

        assert_eq!(state.unwrap(), BodyState::Decoded);
        assert_eq!(decoded(&loader), Some(&Args { a: 9 }));
    }

    #[test]
    fn test_no_target_discards_body() {
        let mut loader = OnePath::default();

        let state = unmarshal(&frame("/other", "json", b"garbage"), Codec::Json, &mut loader);

        assert_eq!(state.unwrap(), BodyState::Discarded);
        assert!(loader.target.is_none());
        assert!(loader.seen.is_some());
    }

    #[test]
    fn test_empty_body_keeps_zero_value() {
        let mut loader = OnePath::default();

        let state = unmarshal(&frame("/add", "json", b""), Codec::Json, &mut loader);

        assert_eq!(state.unwrap(), BodyState::Empty);
        assert_eq!(decoded(&loader), Some(&Args::default()));
    }

    #[test]
    fn test_malformed_body_is_body_decode_error() {
        let mut loader = OnePath::default();

        let err = unmarshal(&frame("/add", "json", b"{oops"), Codec::Json, &mut loader).unwrap_err();

        assert!(matches!(err, WirecallError::BodyDecode(_)));
        assert!(loader.seen.is_some());
    }

    #[test]
    fn test_unknown_codec_with_target() {
        let mut loader = OnePath::default();

        let err = unmarshal(&frame("/add", "proto", b"\x01"), Codec::Json, &mut loader).unwrap_err();

        assert!(matches!(err, WirecallError::UnsupportedCodec(name) if name == "proto"));
    }

    #[test]
    fn test_unknown_codec_discarded_body_is_fine() {
        let mut loader = OnePath::default();

        let state = unmarshal(&frame("/nope", "proto", b"\x01"), Codec::Json, &mut loader);

        assert_eq!(state.unwrap(), BodyState::Discarded);
    }

    #[test]
    fn test_bad_header_never_reaches_loader() {
        let mut loader = OnePath::default();
        let bad = Frame::new(Bytes::from_static(b"\xc1"), Bytes::new());

        assert!(matches!(
            unmarshal(&bad, Codec::Json, &mut loader),
            Err(WirecallError::Protocol(_))
        ));
        assert!(loader.seen.is_none());
    }

    #[test]
    fn test_packet_reset_detaches() {
        let mut packet = Packet {
            header: Header::new(3, PacketKind::Push, "/x"),
            body: Bytes::from_static(b"abc"),
        };
        assert!(!packet.is_detached());

        packet.reset();

        assert!(packet.is_detached());
    }
}
