//! `Authorization` header codec
//!
//! Servers are inconsistent about the scheme prefix: some send
//! `Bearer <token>`, some `bearer <token>`, some just `<token>`. Decoding
//! strips the scheme when it is there and otherwise hands the value back
//! untouched. It never fails on malformed input.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::warn;

use crate::token::AccessToken;

/// Scheme name used when encoding, matched case-insensitively when decoding.
pub const BEARER: &str = "Bearer";

/// Decode an `Authorization` header value into a bare token.
///
/// - `None` or blank input gives `None`
/// - `"Bearer abc"` (any casing, any whitespace run) gives `abc`
/// - anything else is returned as-is, minus surrounding whitespace
pub fn decode(value: Option<&str>) -> Option<AccessToken> {
    let value = value?.trim();
    let mut parts = value.split_ascii_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case(BEARER) => {
            AccessToken::new(token)
        }
        _ => AccessToken::new(value),
    }
}

/// Decode the `Authorization` header of a response.
///
/// Non-UTF-8 header bytes are treated as absent.
pub fn decode_header(headers: &HeaderMap) -> Option<AccessToken> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok();
    decode(value)
}

/// Build the outgoing header map for a stored token.
///
/// Empty when there is no token. The value is marked sensitive so it is
/// masked in reqwest/hyper debug output.
pub fn encode(token: Option<&AccessToken>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(token) = token else {
        return headers;
    };

    match HeaderValue::from_str(&format!("{BEARER} {}", token.as_str())) {
        Ok(mut value) => {
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Err(e) => {
            warn!(error = %e, "stored access token is not a valid header value, sending without it");
        }
    }
    headers
}
