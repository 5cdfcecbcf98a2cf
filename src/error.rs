//! Error types for wirecall.

use thiserror::Error;

/// Main error type for all wirecall operations.
#[derive(Debug, Error)]
pub enum WirecallError {
    /// I/O error on the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Framing error (oversized lengths, undecodable header).
    ///
    /// Fatal to the connection.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The packet body could not be decoded into the handler's argument.
    #[error("Body decode error: {0}")]
    BodyDecode(String),

    /// No handler registered for the given path.
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),

    /// Codec name is not known to this runtime.
    #[error("Unsupported codec: {0:?}")]
    UnsupportedCodec(String),

    /// Error reported by handler code.
    #[error("Handler error: {0}")]
    Handler(String),

    /// Decoded argument did not have the type the handler declared.
    #[error("Argument type mismatch")]
    ArgumentType,

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,
}

impl WirecallError {
    /// Build a handler error from any displayable message.
    pub fn handler(message: impl std::fmt::Display) -> Self {
        Self::Handler(message.to_string())
    }
}

/// Result type alias using WirecallError.
pub type Result<T> = std::result::Result<T, WirecallError>;
