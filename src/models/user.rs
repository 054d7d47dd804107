use chrono::{DateTime, Duration, Utc};
use garde::Validate;
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The roles a user can hold.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSql, FromSql,
)]
#[serde(rename_all = "kebab-case")]
#[postgres(name = "user_role")]
pub enum Role {
    #[default]
    #[postgres(name = "user")]
    User,
    #[postgres(name = "guide")]
    Guide,
    #[postgres(name = "lead-guide")]
    LeadGuide,
    #[postgres(name = "admin")]
    Admin,
}

impl Role {
    /// The wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Guide => "guide",
            Role::LeadGuide => "lead-guide",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "guide" => Ok(Role::Guide),
            "lead-guide" => Ok(Role::LeadGuide),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A pending password reset: the SHA-256 digest of the emailed token and its
/// expiry. Hash and expiry only ever exist together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordReset {
    /// Hex-encoded SHA-256 of the plaintext reset token.
    pub token_hash: String,
    /// The instant after which the token is rejected.
    pub expires_at: DateTime<Utc>,
}

/// Represents a user in the system.
#[derive(Clone, Debug, Validate)]
pub struct User {
    /// The unique identifier for the user.
    #[garde(skip)]
    pub id: Uuid,
    /// The user's display name.
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    /// The user's email address, lower-cased.
    #[garde(email)]
    pub email: String,
    /// The user's Argon2 password hash. Never leaves the process.
    #[garde(length(min = 1))]
    pub password_hash: String,
    /// The user's role.
    #[garde(skip)]
    pub role: Role,
    /// The timestamp of the user's last password change.
    #[garde(skip)]
    pub password_changed_at: Option<DateTime<Utc>>,
    /// The pending password reset, if any.
    #[garde(skip)]
    pub password_reset: Option<PasswordReset>,
    /// Whether the user is active. Inactive users are invisible to lookups.
    #[garde(skip)]
    pub active: bool,
    /// The timestamp when the user was created.
    #[garde(skip)]
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns `true` if the password was changed after a token issued at
    /// `issued_at` (Unix seconds).
    pub fn changed_password_after(&self, issued_at: i64) -> bool {
        self.password_changed_at
            .map(|changed| changed.timestamp() > issued_at)
            .unwrap_or(false)
    }

    /// Replaces the password hash and records the change.
    ///
    /// The change is backdated by one second so a token issued in the same
    /// second still passes `changed_password_after`.
    pub fn set_password_hash(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.password_changed_at = Some(now - Duration::seconds(1));
    }

    /// Drops any pending password reset.
    pub fn clear_password_reset(&mut self) {
        self.password_reset = None;
    }
}

/// The data needed to create a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// The outward view of a user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Jonas".to_string(),
            email: "jonas@example.com".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role: Role::User,
            password_changed_at: None,
            password_reset: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_role_wire_names() {
        for role in [Role::User, Role::Guide, Role::LeadGuide, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(
            serde_json::to_string(&Role::LeadGuide).unwrap(),
            "\"lead-guide\""
        );
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_changed_password_after() {
        let mut user = sample_user();
        let now = Utc::now();
        assert!(!user.changed_password_after(now.timestamp()));

        user.set_password_hash("new".to_string(), now);
        // Backdated by one second, so a token issued `now` is still fresh.
        assert!(!user.changed_password_after(now.timestamp()));
        assert!(user.changed_password_after(now.timestamp() - 60));
    }

    #[test]
    fn test_public_user_has_no_secrets() {
        let mut user = sample_user();
        user.password_reset = Some(PasswordReset {
            token_hash: "abc".to_string(),
            expires_at: Utc::now(),
        });
        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 4);
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password_reset").is_none());
    }

    #[test]
    fn test_user_validation() {
        let mut user = sample_user();
        assert!(user.validate().is_ok());
        user.email = "not-an-email".to_string();
        assert!(user.validate().is_err());
    }
}
