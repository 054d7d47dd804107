use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{
    crypto::token::{Claims, TokenError},
    error::{AppError, Result},
    models::user::User,
    state::AppState,
};

/// The cookie that carries the session token for browser clients.
pub const TOKEN_COOKIE: &str = "jwt";

/// The user resolved by `require_auth`, available to downstream handlers as
/// `Extension<CurrentUser>`.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub user: User,
    pub claims: Claims,
}

/// Why the guard turned a request away.
#[derive(Debug, PartialEq, Eq)]
pub enum GuardRejection {
    NoToken,
    InvalidToken(TokenError),
    UserGone,
    StaleSession,
}

impl From<GuardRejection> for AppError {
    fn from(rejection: GuardRejection) -> Self {
        match rejection {
            GuardRejection::NoToken => AppError::Unauthorized(
                "You are not logged in! Please log in to get access.".to_string(),
            ),
            GuardRejection::InvalidToken(e) => e.into(),
            GuardRejection::UserGone => AppError::Unauthorized(
                "The user belonging to this token does no longer exist.".to_string(),
            ),
            GuardRejection::StaleSession => AppError::Unauthorized(
                "User recently changed password! Please log in again.".to_string(),
            ),
        }
    }
}

/// Extracts the bearer token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Picks the session token from the request.
///
/// The `jwt` cookie is only consulted when no `Authorization` header was
/// sent. A header that is not a usable bearer token yields no token.
fn extract_token(headers: &HeaderMap, cookies: &Cookies) -> Option<String> {
    match headers.get(AUTHORIZATION) {
        Some(value) => bearer_token(value.to_str().ok()).map(str::to_string),
        None => cookies
            .get(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty()),
    }
}

/// Resolves a presented token to the user it was issued to.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `token` - The token found on the request, if any.
///
/// # Returns
///
/// The `CurrentUser`, or a 401 for each rejected state.
pub async fn authorize(state: &AppState, token: Option<&str>) -> Result<CurrentUser> {
    let token = token.ok_or(GuardRejection::NoToken)?;

    let claims = state
        .tokens
        .verify(token)
        .map_err(GuardRejection::InvalidToken)?;

    let user = state
        .store
        .find_by_id(claims.sub)
        .await?
        .ok_or(GuardRejection::UserGone)?;

    if user.changed_password_after(claims.iat) {
        return Err(GuardRejection::StaleSession.into());
    }

    Ok(CurrentUser { user, claims })
}

/// A middleware that requires a valid session token.
///
/// On success the resolved `CurrentUser` is inserted into the request
/// extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_token(request.headers(), &cookies);
    let current = authorize(&state, token.as_deref()).await?;

    tracing::debug!("✅ User authenticated: {}", current.user.id);
    request.extensions_mut().insert(current);

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::user::{NewUser, Role};
    use crate::repositories::{memory::MemoryUserStore, user::{SaveMode, UserStore}};
    use crate::services::mail::LogMailer;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    async fn setup() -> (AppState, MemoryUserStore, User) {
        let store = MemoryUserStore::new();
        let state = AppState::with_parts(
            Config::for_tests(),
            Arc::new(store.clone()),
            Arc::new(LogMailer),
        );
        let user = store
            .create(NewUser {
                name: "Guarded".to_string(),
                email: "guarded@example.com".to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        (state, store, user)
    }

    fn rejection(err: AppError) -> String {
        match err {
            AppError::Unauthorized(msg) => msg,
            other => panic!("expected 401, got {:?}", other),
        }
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(bearer_token(Some("Bearer abc.def")), Some("abc.def"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(Some("Bearer ")), None);
        assert_eq!(bearer_token(None), None);
    }

    #[tokio::test]
    async fn test_authorized() {
        let (state, _, user) = setup().await;
        let token = state.tokens.issue(user.id).unwrap();

        let current = authorize(&state, Some(&token)).await.unwrap();
        assert_eq!(current.user.id, user.id);
        assert_eq!(current.claims.sub, user.id);
    }

    #[tokio::test]
    async fn test_no_token() {
        let (state, _, _) = setup().await;
        let msg = rejection(authorize(&state, None).await.unwrap_err());
        assert!(msg.starts_with("You are not logged in"));
    }

    #[tokio::test]
    async fn test_invalid_and_expired_token() {
        let (state, _, user) = setup().await;

        let msg = rejection(authorize(&state, Some("garbage")).await.unwrap_err());
        assert_eq!(msg, "Invalid token. Please log in again!");

        let old = state
            .tokens
            .issue_at(user.id, Utc::now() - Duration::days(91))
            .unwrap();
        let msg = rejection(authorize(&state, Some(&old)).await.unwrap_err());
        assert_eq!(msg, "Your token has expired! Please log in again.");
    }

    #[tokio::test]
    async fn test_user_gone() {
        let (state, store, user) = setup().await;
        let token = state.tokens.issue(user.id).unwrap();
        store.remove(user.id).await;

        let msg = rejection(authorize(&state, Some(&token)).await.unwrap_err());
        assert_eq!(msg, "The user belonging to this token does no longer exist.");
    }

    #[tokio::test]
    async fn test_stale_session() {
        let (state, store, mut user) = setup().await;
        let token = state
            .tokens
            .issue_at(user.id, Utc::now() - Duration::hours(1))
            .unwrap();

        user.set_password_hash("$argon2id$other".to_string(), Utc::now());
        store.save(&user, SaveMode::Validate).await.unwrap();

        let msg = rejection(authorize(&state, Some(&token)).await.unwrap_err());
        assert_eq!(msg, "User recently changed password! Please log in again.");

        let fresh = state.tokens.issue(user.id).unwrap();
        assert!(authorize(&state, Some(&fresh)).await.is_ok());
    }
}
