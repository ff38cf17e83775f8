//! Access token primitives for the profile API
//!
//! Leaf building blocks used by the session crate. Nothing here performs
//! network I/O or coordinates concurrent callers:
//!
//! - `store`: the persisted access token slot (`TokenStore` and its backends)
//! - `header`: `Authorization` header decoding/encoding
//! - `token`: token extraction from sign-in / refresh responses
//! - `endpoints`: the API endpoint catalog and origin check

pub mod endpoints;
pub mod error;
pub mod header;
pub mod store;
pub mod token;

pub use endpoints::{DEFAULT_BASE_URL, Endpoints};
pub use error::{Error, Result};
pub use store::{ACCESS_TOKEN_SLOT, FileTokenStore, MemoryTokenStore, NullTokenStore, TokenStore};
pub use token::{AccessToken, TokenBody, error_message, extract_access_token};
