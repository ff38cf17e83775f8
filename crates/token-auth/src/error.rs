//! Error types for token primitives

/// Errors from token storage and endpoint setup.
///
/// Store errors never cross the `TokenStore` trait; backends log them and
/// degrade to "no token".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("token file parse error: {0}")]
    Parse(String),

    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

/// Result alias for token primitives.
pub type Result<T> = std::result::Result<T, Error>;
