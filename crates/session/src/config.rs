//! Library-level session settings

use std::time::Duration;

use token_auth::DEFAULT_BASE_URL;

/// Connection settings for a `SessionManager`.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// API origin, e.g. `https://api.example.com`
    pub base_url: String,
    /// Per-request timeout for every call, sign-out included
    pub request_timeout: Duration,
    /// Upper bound on one refresh exchange. Expiry counts as a failed refresh.
    pub refresh_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}
