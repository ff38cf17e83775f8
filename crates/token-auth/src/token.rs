//! Access tokens and their extraction from API responses
//!
//! The API hands out the access token in one of two places: the
//! `Authorization` response header, or an `access_token` field in the JSON
//! body. Sign-in, sign-up and refresh responses all share this shape, so the
//! extraction lives here and the session crate calls it for each.

use std::fmt;

use common::Secret;
use reqwest::header::HeaderMap;
use serde::Deserialize;

use crate::header;

/// Short-lived bearer credential sent with every protected request.
///
/// Redacted in `Debug`/`Display` output. Compare against `&str` in tests.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(Secret<String>);

impl AccessToken {
    /// Wrap a raw token value.
    ///
    /// Returns `None` for empty or whitespace-only input; an empty string is
    /// never a usable token.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return None;
        }
        Some(Self(Secret::new(value)))
    }

    /// The raw token string. Only for building outgoing headers and persisting.
    pub fn as_str(&self) -> &str {
        self.0.expose()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccessToken").field(&self.0).finish()
    }
}

impl PartialEq<str> for AccessToken {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for AccessToken {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// JSON fields the API may include in auth responses.
///
/// `refresh_token` is deserialized so its presence is tolerated, but it is
/// never stored: the refresh credential only travels in the cookie jar.
#[derive(Debug, Default, Deserialize)]
pub struct TokenBody {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl TokenBody {
    /// Parse a response body, treating anything that isn't a JSON object as empty.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }
}

/// Pull the access token out of a response: header first, then the JSON body.
pub fn extract_access_token(headers: &HeaderMap, body: &[u8]) -> Option<AccessToken> {
    header::decode_header(headers)
        .or_else(|| TokenBody::parse(body).access_token.and_then(AccessToken::new))
}

/// Human-readable failure message for a rejected auth or API call.
///
/// Prefers the JSON `error` field, then the raw body text, then a generic
/// message naming the status.
pub fn error_message(status: u16, body: &[u8]) -> String {
    match TokenBody::parse(body).error {
        Some(serde_json::Value::String(message)) if !message.is_empty() => return message,
        Some(serde_json::Value::Null) | None => {}
        Some(other) => return other.to_string(),
    }

    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        format!("request failed ({status})")
    } else {
        raw.to_string()
    }
}
