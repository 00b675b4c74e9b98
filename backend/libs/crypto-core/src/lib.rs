//! Token and password primitives shared by the catalog binaries.
//!
//! - [`jwt`]: HMAC-signed access tokens (issue / verify)
//! - [`password`]: Argon2id password hashing

pub mod jwt;
pub mod password;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("token has expired")]
    TokenExpired,
    #[error("invalid token: {0}")]
    InvalidToken(String),
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("token encoding failed: {0}")]
    Encoding(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
