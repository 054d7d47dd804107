use crate::error::{AppError, Result};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

/// The memory cost for Argon2 in MB.
const ARGON2_MEMORY_MB: u32 = 19;
/// The number of iterations for Argon2.
const ARGON2_ITERATIONS: u32 = 2;
/// The parallelism factor for Argon2.
const ARGON2_PARALLELISM: u32 = 1;

/// Hashes a password using Argon2id.
///
/// # Arguments
///
/// * `password` - The password to hash.
///
/// # Returns
///
/// A `Result` containing the PHC-encoded hash.
pub fn hash_password(password: &str) -> Result<String> {
    let mut password_bytes = password.as_bytes().to_vec();

    let mut salt_bytes = [0u8; 16];
    OsRng.fill_bytes(&mut salt_bytes);

    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AppError::Internal(format!("Salt encoding error: {}", e)))?;

    let argon2 = Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        ParamsBuilder::new()
            .m_cost(ARGON2_MEMORY_MB * 1024)
            .t_cost(ARGON2_ITERATIONS)
            .p_cost(ARGON2_PARALLELISM)
            .build()
            .map_err(|e| AppError::Internal(format!("Argon2 params: {}", e)))?,
    );

    let password_hash = argon2
        .hash_password(&password_bytes, &salt)
        .map_err(|e| AppError::Internal(format!("Argon2 hash error: {}", e)))?
        .to_string();

    password_bytes.zeroize();
    tracing::debug!("Password hashed successfully with Argon2");
    Ok(password_hash)
}

/// Checks a plaintext password against a stored hash.
///
/// A mismatch is `false`, never an error. A stored hash that cannot be parsed
/// is also `false`.
pub fn check_password(password: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!("❌ Stored password hash is unreadable: {}", e);
            return false;
        }
    };

    let mut password_bytes = password.as_bytes().to_vec();
    let result = Argon2::default()
        .verify_password(&password_bytes, &parsed_hash)
        .is_ok();

    password_bytes.zeroize();
    tracing::debug!("Password verification completed");
    result
}

/// Runs `hash_password` on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let mut password = password;
        let hashed = hash_password(&password);
        password.zeroize();
        hashed
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

/// Runs `check_password` on the blocking pool.
pub async fn check_password_blocking(password: String, stored_hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let mut password = password;
        let matches = check_password(&password, &stored_hash);
        password.zeroize();
        matches
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let password = "TestPassword123!";
        let hash = hash_password(password).unwrap();

        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2id$"));
        assert!(check_password(password, &hash));
        assert!(!check_password("WrongPassword", &hash));
    }

    #[test]
    fn test_check_is_independent_of_content() {
        let samples = ["a", "pass word with spaces", "ünïcødé-🔐", &"x".repeat(128)];
        for password in samples {
            let hash = hash_password(password).unwrap();
            assert!(check_password(password, &hash));
            assert!(!check_password(&format!("{}!", password), &hash));
            assert!(!check_password("", &hash));
        }
    }

    #[test]
    fn test_unreadable_hash_is_a_mismatch() {
        assert!(!check_password("anything", "not-a-phc-string"));
        assert!(!check_password("anything", ""));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hash = hash_password_blocking("BlockingPass1".to_string())
            .await
            .unwrap();
        assert!(check_password_blocking("BlockingPass1".to_string(), hash.clone())
            .await
            .unwrap());
        assert!(!check_password_blocking("nope".to_string(), hash)
            .await
            .unwrap());
    }
}
