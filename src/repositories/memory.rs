use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::user::{NewUser, User},
    repositories::user::{check_before_save, SaveMode, UserStore, DUPLICATE_EMAIL},
};

/// An in-process `UserStore`, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl MemoryUserStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user outright. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.users.write().await.remove(&id).is_some()
    }

    /// The number of stored users, active or not.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    /// Whether the store holds no users.
    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| u.active && u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&id).filter(|u| u.active).cloned())
    }

    async fn find_by_reset_token(&self, token_hash: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|u| {
                u.active
                    && u.password_reset
                        .as_ref()
                        .is_some_and(|reset| reset.token_hash == token_hash)
            })
            .cloned())
    }

    async fn create(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(AppError::Validation(DUPLICATE_EMAIL.to_string()));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            role: new_user.role,
            password_changed_at: None,
            password_reset: None,
            active: true,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());

        tracing::info!("✅ User created with ID: {}", user.id);
        Ok(user)
    }

    async fn save(&self, user: &User, mode: SaveMode) -> Result<()> {
        check_before_save(user, mode)?;

        let mut users = self.users.write().await;

        if !users.contains_key(&user.id) {
            return Err(AppError::NotFound("No user found with that ID".to_string()));
        }

        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AppError::Validation(DUPLICATE_EMAIL.to_string()));
        }

        users.insert(user.id, user.clone());
        tracing::debug!("User {} saved ({:?})", user.id, mode);
        Ok(())
    }
}
