//! Profile API endpoint catalog
//!
//! All auth endpoints hang off a single base URL. The refresh and revoke
//! endpoints share a path and differ only by method (`POST` vs `DELETE`).

use reqwest::Url;

use crate::error::{Error, Result};

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

pub const SIGN_UP_PATH: &str = "/auth/sign_up";
pub const SIGN_IN_PATH: &str = "/auth/sign_in";
/// `POST` exchanges the refresh cookie for a new access token; `DELETE` revokes it.
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const SIGN_OUT_PATH: &str = "/auth/sign_out";
pub const ME_PATH: &str = "/me";

/// Resolved endpoint URLs for one API deployment.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    origin: Url,
}

impl Endpoints {
    /// Build the catalog from a base URL such as `https://api.example.com`.
    ///
    /// Trailing slashes are trimmed. Only `http` and `https` are accepted.
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/').to_string();
        let origin = Url::parse(&base).map_err(|e| Error::InvalidUrl(format!("{base}: {e}")))?;
        if !matches!(origin.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{base}: scheme must be http or https"
            )));
        }
        if origin.host_str().is_none() {
            return Err(Error::InvalidUrl(format!("{base}: missing host")));
        }
        Ok(Self { base, origin })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Absolute URL for an API path. A missing leading slash is added.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }

    pub fn sign_up(&self) -> String {
        self.url(SIGN_UP_PATH)
    }

    pub fn sign_in(&self) -> String {
        self.url(SIGN_IN_PATH)
    }

    pub fn refresh(&self) -> String {
        self.url(REFRESH_PATH)
    }

    pub fn sign_out(&self) -> String {
        self.url(SIGN_OUT_PATH)
    }

    /// Same URL as `refresh`, used with `DELETE`.
    pub fn revoke(&self) -> String {
        self.url(REFRESH_PATH)
    }

    pub fn me(&self) -> String {
        self.url(ME_PATH)
    }

    /// Whether `url` points at this API's origin (scheme, host and port).
    ///
    /// The access token is only ever attached to same-origin requests.
    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.origin.scheme()
            && url.host_str() == self.origin.host_str()
            && url.port_or_known_default() == self.origin.port_or_known_default()
    }
}
