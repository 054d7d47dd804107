use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::Pool;
use garde::Validate;
use tokio_postgres::{error::SqlState, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, PasswordReset, Role, User},
};

/// The message returned when an email address is already taken.
pub const DUPLICATE_EMAIL: &str = "Duplicate field value: email. Please use another value!";

/// Whether `save` re-validates the record before writing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaveMode {
    Validate,
    SkipValidation,
}

/// Persistent storage for user records.
///
/// Every lookup ignores inactive users. Writes are last-write-wins; no
/// implementation locks a record across calls.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Finds an active user by (lower-cased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Finds an active user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Finds an active user holding a pending reset with this token hash.
    /// Expiry is left to the caller.
    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>>;

    /// Creates a user. Fails with a validation error on a duplicate email.
    async fn create(&self, new_user: NewUser) -> Result<User>;

    /// Writes every mutable field of `user` back to the store.
    async fn save(&self, user: &User, mode: SaveMode) -> Result<()>;
}

/// Runs the record-level checks requested by `mode`.
pub(crate) fn check_before_save(user: &User, mode: SaveMode) -> Result<()> {
    if mode == SaveMode::Validate {
        user.validate()?;
    }
    Ok(())
}

/// A PostgreSQL-backed `UserStore`.
#[derive(Clone)]
pub struct PgUserStore {
    pool: Pool,
}

impl PgUserStore {
    /// Creates a store over an existing pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

/// A helper function to map a `tokio_postgres::Row` to a `User`.
fn row_to_user(row: &Row) -> Result<User> {
    let reset_token: Option<String> = row.try_get("password_reset_token")?;
    let reset_expires: Option<DateTime<Utc>> = row.try_get("password_reset_expires")?;

    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: row.try_get::<_, Role>("role")?,
        password_changed_at: row.try_get("password_changed_at")?,
        password_reset: reset_token
            .zip(reset_expires)
            .map(|(token_hash, expires_at)| PasswordReset { token_hash, expires_at }),
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_unique_violation(e: tokio_postgres::Error) -> AppError {
    if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        AppError::Validation(DUPLICATE_EMAIL.to_string())
    } else {
        AppError::Database(e)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE email = $1 AND active = true
                "#,
                &[&email],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE id = $1 AND active = true
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM users
                WHERE password_reset_token = $1 AND active = true
                "#,
                &[&token_hash],
            )
            .await?;
        row.map(|r| row_to_user(&r)).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                r#"
                INSERT INTO users (id, name, email, password_hash, role)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
                &[
                    &id,
                    &new_user.name,
                    &new_user.email,
                    &new_user.password_hash,
                    &new_user.role,
                ],
            )
            .await
            .map_err(map_unique_violation)?;

        let user = row_to_user(&row)?;
        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn save(&self, user: &User, mode: SaveMode) -> Result<()> {
        check_before_save(user, mode)?;

        let (reset_token, reset_expires) = match &user.password_reset {
            Some(reset) => (Some(reset.token_hash.as_str()), Some(reset.expires_at)),
            None => (None, None),
        };

        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE users
                SET
                    name = $1,
                    email = $2,
                    password_hash = $3,
                    role = $4,
                    password_changed_at = $5,
                    password_reset_token = $6,
                    password_reset_expires = $7,
                    active = $8
                WHERE id = $9
                "#,
                &[
                    &user.name,
                    &user.email,
                    &user.password_hash,
                    &user.role,
                    &user.password_changed_at,
                    &reset_token,
                    &reset_expires,
                    &user.active,
                    &user.id,
                ],
            )
            .await
            .map_err(map_unique_violation)?;

        if updated == 0 {
            return Err(AppError::NotFound("No user found with that ID".to_string()));
        }

        tracing::debug!("User {} saved ({:?})", user.id, mode);
        Ok(())
    }
}
