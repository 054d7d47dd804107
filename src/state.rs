use chrono::Duration;
use std::sync::Arc;
use crate::config::Config;
use crate::crypto::{reset::ResetTokens, token::TokenCodec};
use crate::error::Result;
use crate::repositories::{
    memory::MemoryUserStore,
    user::{PgUserStore, UserStore},
};
use crate::services::mail::{LogMailer, Mailer};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Where user records live.
    pub store: Arc<dyn UserStore>,
    /// Delivers reset emails.
    pub mailer: Arc<dyn Mailer>,
    /// Issues and verifies session tokens.
    pub tokens: TokenCodec,
    /// Generates and matches password reset tokens.
    pub reset_tokens: ResetTokens,
    /// The application's configuration.
    pub config: Config,
}

impl AppState {
    /// Creates a new `AppState` from configuration.
    ///
    /// Uses PostgreSQL when `DATABASE_URL` is set and the in-memory store
    /// otherwise. Mail is written to the log.
    pub async fn new(config: &Config) -> Result<Self> {
        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let pool = crate::db::create_pool(url)?;
                crate::db::ensure_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL user store initialized");
                Arc::new(PgUserStore::new(pool))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL not set, users are kept in memory");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::with_parts(config.clone(), store, Arc::new(LogMailer)))
    }

    /// Assembles a state from explicit collaborators.
    pub fn with_parts(config: Config, store: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        let tokens = TokenCodec::new(
            config.jwt_secret.as_bytes(),
            Duration::days(config.jwt_expires_in_days),
        );
        let reset_tokens = ResetTokens::new(Duration::minutes(config.reset_token_ttl_minutes));

        Self {
            store,
            mailer,
            tokens,
            reset_tokens,
            config,
        }
    }
}
