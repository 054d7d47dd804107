//! Session tokens.
//!
//! Tokens are HS256 JWTs carrying the user id (`sub`) and the issuance time
//! (`iat`). They are never stored: a token is valid when its signature checks
//! out and `exp` has not passed.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::AppError;

/// The claims embedded in a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: Uuid,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Expires at (Unix seconds).
    pub exp: i64,
}

/// Why a token was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    #[error("token is invalid: {0}")]
    Invalid(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => {
                AppError::Unauthorized("Your token has expired! Please log in again.".to_string())
            }
            TokenError::Invalid(_) => {
                AppError::Unauthorized("Invalid token. Please log in again!".to_string())
            }
        }
    }
}

/// Issues and verifies session tokens with a fixed secret and validity.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl TokenCodec {
    /// Creates a codec signing with `secret`; tokens live for `validity`.
    pub fn new(secret: &[u8], validity: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            validity,
        }
    }

    /// How long issued tokens stay valid.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issues a token for `user_id`, issued now.
    pub fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        self.issue_at(user_id, Utc::now())
    }

    /// Issues a token for `user_id` as if it had been issued at `issued_at`.
    pub fn issue_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String, AppError> {
        let claims = Claims {
            sub: user_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.validity).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verifies a token's signature and expiry and returns its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
