//! Request addressing: URI → path and query.
//!
//! Parsing is strict about escapes and control characters, and callers are
//! tolerant about failure: [`Address::parse_or_default`] turns a malformed URI
//! into an empty path and an empty query instead of failing the exchange.
//!
//! The path is taken exactly as written, only percent-decoded: dot segments
//! stay, and a relative path stays relative. Absolute URIs lose their scheme
//! and authority.
//!
//! # Example
//!
//! ```
//! use wirecall::handler::Address;
//!
//! let addr = Address::parse("/users?id=42&id=7").unwrap();
//! assert_eq!(addr.path(), "/users");
//! assert_eq!(addr.query()["id"], vec!["42", "7"]);
//!
//! let bad = Address::parse_or_default("/users?id=%zz");
//! assert_eq!(bad.path(), "");
//! assert!(bad.query().is_empty());
//! ```

use std::collections::HashMap;

use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::{form_urlencoded, Url};

/// Query parameters: every value of a key, in wire order.
pub type QueryValues = HashMap<String, Vec<String>>;

/// Why a URI could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// `%` not followed by two hex digits.
    #[error("invalid URI escape {escape:?} at byte {offset}")]
    InvalidEscape { offset: usize, escape: String },

    /// ASCII control character in the URI.
    #[error("invalid control character in URI at byte {0}")]
    ControlCharacter(usize),

    /// Decoded path is not UTF-8.
    #[error("URI path is not valid UTF-8 once decoded")]
    NotUtf8,

    /// Absolute URI with a structural error (e.g. a bad authority).
    #[error("invalid URI: {0}")]
    Url(#[from] url::ParseError),
}

/// A parsed request address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    path: String,
    query: QueryValues,
}

impl Address {
    /// Parse a request URI.
    ///
    /// The empty URI parses to the empty address.
    pub fn parse(uri: &str) -> Result<Self, AddressError> {
        if uri.is_empty() {
            return Ok(Self::default());
        }
        check_escapes(uri)?;

        let reference = uri.split_once('#').map_or(uri, |(before, _)| before);
        let (reference, raw_query) = match reference.split_once('?') {
            Some((before, query)) => (before, query),
            None => (reference, ""),
        };

        let raw_path = match split_scheme(reference) {
            Some(rest) => {
                Url::parse(uri)?;
                match rest.strip_prefix("//") {
                    Some(_) => strip_authority(rest),
                    // Opaque, e.g. `mailto:ops@example.com`.
                    None if !rest.starts_with('/') => "",
                    None => rest,
                }
            }
            None => strip_authority(reference),
        };

        let path = percent_decode_str(raw_path)
            .decode_utf8()
            .map_err(|_| AddressError::NotUtf8)?
            .into_owned();

        let mut query = QueryValues::new();
        for (key, value) in form_urlencoded::parse(raw_query.as_bytes()) {
            query
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Ok(Self { path, query })
    }

    /// Parse a request URI, degrading to the empty address on error.
    pub fn parse_or_default(uri: &str) -> Self {
        match Self::parse(uri) {
            Ok(address) => address,
            Err(e) => {
                tracing::debug!("Malformed URI {:?}, using empty address: {}", uri, e);
                Self::default()
            }
        }
    }

    /// Decoded path, e.g. `/users`.
    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query parameters.
    #[inline]
    pub fn query(&self) -> &QueryValues {
        &self.query
    }

    /// First value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key)?.first().map(String::as_str)
    }
}

/// Split off a leading `scheme:`, returning the rest.
///
/// A colon after the first `/` belongs to the path, not to a scheme.
fn split_scheme(reference: &str) -> Option<&str> {
    let (scheme, rest) = reference.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(rest)
}

/// Drop a leading `//authority`, keeping the path that follows.
fn strip_authority(reference: &str) -> &str {
    match reference.strip_prefix("//") {
        Some(rest) => rest.find('/').map_or("", |i| &rest[i..]),
        None => reference,
    }
}

/// Reject control characters and malformed percent-escapes.
fn check_escapes(uri: &str) -> Result<(), AddressError> {
    let bytes = uri.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let escape = bytes.get(i + 1..i + 3);
                match escape {
                    Some([hi, lo]) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => i += 3,
                    _ => {
                        let end = (i + 3).min(bytes.len());
                        return Err(AddressError::InvalidEscape {
                            offset: i,
                            escape: String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                        });
                    }
                }
            }
            b if b < 0x20 || b == 0x7f => return Err(AddressError::ControlCharacter(i)),
            _ => i += 1,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_and_repeated_query_keys() {
        let addr = Address::parse("/users?id=42&id=7").unwrap();

        assert_eq!(addr.path(), "/users");
        assert_eq!(addr.query()["id"], vec!["42".to_string(), "7".to_string()]);
        assert_eq!(addr.query_value("id"), Some("42"));
    }

    #[test]
    fn test_percent_decoding() {
        let addr = Address::parse("/files/a%20b?name=x%26y&q=a+b").unwrap();

        assert_eq!(addr.path(), "/files/a b");
        assert_eq!(addr.query_value("name"), Some("x&y"));
        assert_eq!(addr.query_value("q"), Some("a b"));
    }

    #[test]
    fn test_fragment_is_ignored() {
        let addr = Address::parse("/a?x=1#frag").unwrap();
        assert_eq!(addr.path(), "/a");
        assert_eq!(addr.query().len(), 1);
    }

    #[test]
    fn test_absolute_uri() {
        let addr = Address::parse("tcp://10.0.0.1:9090/home/index?page=2").unwrap();
        assert_eq!(addr.path(), "/home/index");
        assert_eq!(addr.query_value("page"), Some("2"));
    }

    #[test]
    fn test_relative_path_stays_relative() {
        let addr = Address::parse("users?id=1").unwrap();
        assert_eq!(addr.path(), "users");
        assert_eq!(addr.query_value("id"), Some("1"));
    }

    #[test]
    fn test_dot_segments_are_kept() {
        assert_eq!(Address::parse("/a/../b").unwrap().path(), "/a/../b");
        assert_eq!(Address::parse("/a/./b").unwrap().path(), "/a/./b");
        assert_eq!(
            Address::parse("tcp://host:1/a/../admin").unwrap().path(),
            "/a/../admin"
        );
    }

    #[test]
    fn test_query_only_has_empty_path() {
        let addr = Address::parse("?x=1").unwrap();
        assert_eq!(addr.path(), "");
        assert_eq!(addr.query_value("x"), Some("1"));
    }

    #[test]
    fn test_authority_without_scheme() {
        assert_eq!(Address::parse("//host/p?q=1").unwrap().path(), "/p");
        assert_eq!(Address::parse("//host").unwrap().path(), "");
    }

    #[test]
    fn test_opaque_uri_has_empty_path() {
        let addr = Address::parse("mailto:ops@example.com").unwrap();
        assert_eq!(addr.path(), "");
    }

    #[test]
    fn test_colon_after_slash_is_path() {
        assert_eq!(Address::parse("/a:b").unwrap().path(), "/a:b");
    }

    #[test]
    fn test_empty_uri() {
        assert_eq!(Address::parse("").unwrap(), Address::default());
    }

    #[test]
    fn test_no_query() {
        let addr = Address::parse("/ping").unwrap();
        assert_eq!(addr.path(), "/ping");
        assert!(addr.query().is_empty());
        assert_eq!(addr.query_value("x"), None);
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            Address::parse("/users?id=%zz"),
            Err(AddressError::InvalidEscape {
                offset: 10,
                escape: "%zz".to_string()
            })
        );
    }

    #[test]
    fn test_truncated_escape() {
        assert!(matches!(
            Address::parse("/users%4"),
            Err(AddressError::InvalidEscape { offset: 6, .. })
        ));
        assert!(Address::parse("/users%").is_err());
    }

    #[test]
    fn test_control_character() {
        assert_eq!(
            Address::parse("/a\nb"),
            Err(AddressError::ControlCharacter(2))
        );
    }

    #[test]
    fn test_non_utf8_path() {
        assert_eq!(Address::parse("/%ff%fe"), Err(AddressError::NotUtf8));
    }

    #[test]
    fn test_parse_or_default_degrades() {
        let addr = Address::parse_or_default("/users?id=%zz");
        assert_eq!(addr.path(), "");
        assert!(addr.query().is_empty());
    }
}
