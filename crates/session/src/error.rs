//! Error types for session operations

use std::time::Duration;

/// Why a refresh attempt failed.
///
/// `Clone` because every caller joined to the same in-flight refresh receives
/// its own copy of the outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshError {
    #[error("refresh endpoint returned {0}")]
    Status(u16),

    #[error("refresh response carried no access token")]
    MissingToken,

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh timed out after {0:?}")]
    Timeout(Duration),

    /// The session was signed out or replaced while the refresh ran.
    #[error("session changed while refreshing")]
    Superseded,
}

/// Errors surfaced to callers of the session core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Refresh after a 401 failed. The token store has been cleared.
    #[error("session refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),

    /// Still unauthorized after a successful refresh and one retry.
    #[error("session is no longer valid")]
    Unauthorized,

    #[error("network failure: {0}")]
    Network(String),

    /// The API answered with a non-success status (sign-in rejected, etc.).
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid request: {0}")]
    Request(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the user has to sign in again.
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Error::Unauthorized | Error::RefreshFailed(_))
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
