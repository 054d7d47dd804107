use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::user::PasswordReset;

/// The size of the reset token in bytes.
const RESET_TOKEN_SIZE: usize = 32;

/// The message for every failed reset-token match.
pub const INVALID_RESET_TOKEN: &str = "Token is invalid or has expired";

/// A freshly generated reset token.
///
/// `plain` goes to the user by email and nowhere else; `reset` is what gets
/// stored on the user record.
#[derive(Debug)]
pub struct IssuedResetToken {
    pub plain: String,
    pub reset: PasswordReset,
}

/// Generates and matches one-time password reset tokens.
#[derive(Clone, Debug)]
pub struct ResetTokens {
    ttl: Duration,
}

impl ResetTokens {
    /// Creates a manager whose tokens expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self { ttl }
    }

    /// Generates a new token valid from now.
    pub fn generate(&self) -> IssuedResetToken {
        self.generate_at(Utc::now())
    }

    /// Generates a new token valid from `now`.
    pub fn generate_at(&self, now: DateTime<Utc>) -> IssuedResetToken {
        let mut bytes = [0u8; RESET_TOKEN_SIZE];
        OsRng.fill_bytes(&mut bytes);
        let plain = hex::encode(bytes);

        IssuedResetToken {
            reset: PasswordReset {
                token_hash: Self::hash(&plain),
                expires_at: now + self.ttl,
            },
            plain,
        }
    }

    /// The one-way digest stored in place of a plaintext token.
    pub fn hash(token: &str) -> String {
        hex::encode(Sha256::digest(token.as_bytes()))
    }

    /// Checks `incoming` against a stored hash and expiry.
    pub fn matches(
        &self,
        incoming: &str,
        stored_hash: &str,
        stored_expiry: DateTime<Utc>,
    ) -> Result<()> {
        self.matches_at(incoming, stored_hash, stored_expiry, Utc::now())
    }

    /// Checks `incoming` against a stored hash and expiry as of `now`.
    pub fn matches_at(
        &self,
        incoming: &str,
        stored_hash: &str,
        stored_expiry: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let incoming_hash = Self::hash(incoming);
        let same: bool = incoming_hash.as_bytes().ct_eq(stored_hash.as_bytes()).into();

        if !same || stored_expiry <= now {
            return Err(AppError::Validation(INVALID_RESET_TOKEN.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ResetTokens {
        ResetTokens::new(Duration::minutes(10))
    }

    #[test]
    fn test_generate_shape() {
        let now = Utc::now();
        let issued = manager().generate_at(now);

        assert_eq!(issued.plain.len(), RESET_TOKEN_SIZE * 2);
        assert!(issued.plain.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(issued.reset.token_hash, issued.plain);
        assert_eq!(issued.reset.token_hash, ResetTokens::hash(&issued.plain));
        assert_eq!(issued.reset.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn test_tokens_are_unique() {
        let manager = manager();
        let a = manager.generate();
        let b = manager.generate();
        assert_ne!(a.plain, b.plain);
        assert_ne!(a.reset.token_hash, b.reset.token_hash);
    }

    #[test]
    fn test_matches_only_exact_plaintext() {
        let manager = manager();
        let issued = manager.generate();
        let PasswordReset { token_hash, expires_at } = issued.reset.clone();

        assert!(manager.matches(&issued.plain, &token_hash, expires_at).is_ok());
        assert!(manager.matches(&issued.plain.to_uppercase(), &token_hash, expires_at).is_err());
        assert!(manager.matches(&issued.plain[1..], &token_hash, expires_at).is_err());
        // Presenting the stored hash itself must not work.
        assert!(manager.matches(&token_hash, &token_hash, expires_at).is_err());
    }

    #[test]
    fn test_matches_rejects_after_expiry() {
        let manager = manager();
        let issued_at = Utc::now() - Duration::minutes(11);
        let issued = manager.generate_at(issued_at);

        let err = manager
            .matches(&issued.plain, &issued.reset.token_hash, issued.reset.expires_at)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(ref m) if m == INVALID_RESET_TOKEN));

        let before_expiry = issued.reset.expires_at - Duration::seconds(1);
        assert!(manager
            .matches_at(&issued.plain, &issued.reset.token_hash, issued.reset.expires_at, before_expiry)
            .is_ok());
    }
}
