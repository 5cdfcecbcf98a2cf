//! JSON codec using `serde_json`.

use crate::error::Result;

/// JSON codec for structured data.
pub struct JsonCodec;

impl JsonCodec {
    /// Encode a value to JSON bytes.
    #[inline]
    pub fn encode<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_encode_is_compact_json() {
        let encoded = JsonCodec::encode(&serde_json::json!({"id": 42})).unwrap();
        assert_eq!(encoded, br#"{"id":42}"#);
    }

    #[test]
    fn test_decode_struct() {
        #[derive(Deserialize, PartialEq, Debug)]
        struct User {
            id: u32,
            name: String,
        }

        let decoded: User = JsonCodec::decode(br#"{"id":7,"name":"ann"}"#).unwrap();
        assert_eq!(
            decoded,
            User {
                id: 7,
                name: "ann".to_string()
            }
        );
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<u32> = JsonCodec::decode(b"{not json");
        assert!(result.is_err());
    }
}
