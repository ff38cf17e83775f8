//! Cookie jar carrying the refresh credential
//!
//! The refresh token is an HTTP-only cookie set by sign-in/sign-up and sent
//! back on refresh and revoke. reqwest's `Jar` has no way to drop its
//! contents, so this wrapper swaps in a fresh jar on `clear()`, which is how
//! sign-out forgets the credential locally even if the revoke call failed.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use tracing::debug;

/// Clearable cookie store installed on the session's HTTP client.
#[derive(Debug, Default)]
pub struct CookieJar {
    jar: RwLock<Arc<Jar>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every cookie, the refresh credential included.
    pub fn clear(&self) {
        *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Jar::default());
        debug!("cleared session cookies");
    }

    fn current(&self) -> Arc<Jar> {
        Arc::clone(&self.jar.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        self.current().set_cookies(cookie_headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.current().cookies(url)
    }
}
