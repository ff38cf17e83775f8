//! Session core for the profile API client
//!
//! Owns the access token lifecycle: sign-in/sign-up store a token, every
//! protected call carries it, an unauthorized response triggers one shared
//! refresh and one retry, and sign-out forgets everything locally.
//!
//! Request lifecycle:
//! 1. Caller builds a request via `SessionManager::request()` (or a helper)
//! 2. `SessionManager::send()` attaches `Authorization: Bearer <token>`
//! 3. On 401, `SessionManager::refresh()` exchanges the refresh cookie for a
//!    new token; concurrent callers share the same exchange
//! 4. The request is retried once with the new token; that outcome is final
//!
//! The refresh credential is an HTTP-only cookie held in `CookieJar`. This
//! crate never reads it, it only makes sure the jar rides along.

pub mod config;
pub mod cookies;
pub mod error;
pub mod manager;
pub mod refresh;
pub mod request;

#[cfg(test)]
mod test_support;

pub use config::SessionConfig;
pub use cookies::CookieJar;
pub use error::{Error, RefreshError, Result};
pub use manager::{SessionManager, SignUp};
pub use token_auth::{AccessToken, FileTokenStore, MemoryTokenStore, NullTokenStore, TokenStore};
