use garde::Validate;

use crate::error::{AppError, Result};

/// Canonical form of an email address for storage and lookup.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Runs a payload's garde rules, mapping the report to a 400.
pub fn validate_payload<T>(payload: &T) -> Result<()>
where
    T: Validate,
    T::Context: Default,
{
    payload.validate().map_err(AppError::from)
}

/// Ensures both login credentials were supplied.
///
/// # Arguments
///
/// * `email` - The submitted email, possibly empty.
/// * `password` - The submitted password, possibly empty.
///
/// # Returns
///
/// A `Result<()>` indicating whether both are present.
pub fn require_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Please provide email and password!".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jonas@Example.COM "), "jonas@example.com");
    }

    #[test]
    fn test_require_credentials() {
        assert!(require_credentials("a@example.com", "secret123").is_ok());
        assert!(require_credentials("", "secret123").is_err());
        assert!(require_credentials("a@example.com", "").is_err());
        assert!(require_credentials("   ", "secret123").is_err());
    }
}
