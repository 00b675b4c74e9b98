//! Access token issuance and validation.
//!
//! Tokens are signed with a shared secret using one of the HMAC algorithms
//! (HS256, HS384, HS512). Asymmetric algorithms are rejected at construction
//! so a verifier can never be tricked into accepting a different key type.
//!
//! ```rust
//! use crypto_core::jwt::JwtKeys;
//! use std::time::Duration;
//!
//! let keys = JwtKeys::new(
//!     "an-example-secret-that-is-long-enough",
//!     "HS256",
//!     Duration::from_secs(30 * 60),
//! ).unwrap();
//! let token = keys.issue(1, "alice").unwrap();
//! let claims = keys.verify(&token.access_token).unwrap();
//! assert_eq!(claims.sub, "alice");
//! ```

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::{CryptoError, Result};

/// Claims carried by every access token
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Numeric user id
    pub uid: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Token response returned to clients after login
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Signing and verification keys derived from one shared secret.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    ttl: Duration,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("algorithm", &self.algorithm)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Parse an algorithm name, accepting only the HMAC family.
pub fn parse_hmac_algorithm(name: &str) -> Result<Algorithm> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
    }
}

impl JwtKeys {
    pub fn new(secret: &str, algorithm: &str, ttl: Duration) -> Result<Self> {
        let algorithm = parse_hmac_algorithm(algorithm)?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            algorithm,
            ttl,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue an access token for the given user.
    pub fn issue(&self, user_id: i64, username: &str) -> Result<AccessToken> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims {
            sub: username.to_string(),
            uid: user_id,
            iat: now,
            exp: now.saturating_add(ttl),
        };

        let access_token = self.encode_claims(&claims)?;
        Ok(AccessToken {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: ttl,
        })
    }

    /// Sign arbitrary claims with these keys.
    pub fn encode_claims(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| CryptoError::Encoding(e.to_string()))
    }

    /// Validate signature, algorithm and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => CryptoError::TokenExpired,
                _ => CryptoError::InvalidToken(e.to_string()),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-with-at-least-32-bytes!!";

    fn keys() -> JwtKeys {
        JwtKeys::new(SECRET, "HS256", Duration::from_secs(1800)).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = keys();
        let token = keys.issue(42, "alice").unwrap();

        assert_eq!(token.token_type, "bearer");
        assert_eq!(token.expires_in, 1800);

        let claims = keys.verify(&token.access_token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.uid, 42);
        assert_eq!(claims.exp - claims.iat, 1800);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = keys();
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: "alice".into(),
            uid: 1,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = keys.encode_claims(&claims).unwrap();

        assert!(matches!(keys.verify(&token), Err(CryptoError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().issue(1, "alice").unwrap();
        let other = JwtKeys::new(
            "a-completely-different-secret-value!!!",
            "HS256",
            Duration::from_secs(1800),
        )
        .unwrap();

        assert!(matches!(
            other.verify(&token.access_token),
            Err(CryptoError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let token = keys().issue(1, "alice").unwrap();
        let hs512 = JwtKeys::new(SECRET, "HS512", Duration::from_secs(1800)).unwrap();

        assert!(hs512.verify(&token.access_token).is_err());
    }

    #[test]
    fn test_garbage_token_rejected() {
        assert!(matches!(
            keys().verify("not.a.jwt"),
            Err(CryptoError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_only_hmac_algorithms_accepted() {
        assert_eq!(parse_hmac_algorithm("hs384").unwrap(), Algorithm::HS384);
        assert!(matches!(
            parse_hmac_algorithm("RS256"),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
        assert!(JwtKeys::new(SECRET, "none", Duration::from_secs(60)).is_err());
    }

    #[test]
    fn test_debug_hides_key_material() {
        let rendered = format!("{:?}", keys());
        assert!(!rendered.contains(SECRET));
        assert!(rendered.contains("HS256"));
    }
}
