use chrono::Utc;

use crate::crypto::password::{check_password_blocking, hash_password_blocking};
use crate::crypto::reset::{ResetTokens, INVALID_RESET_TOKEN};
use crate::error::{AppError, Result};
use crate::models::user::{NewUser, Role, User};
use crate::repositories::user::SaveMode;
use crate::services::mail::Email;
use crate::state::AppState;
use crate::validation::auth::normalize_email;

/// The single message for every failed login.
pub const INCORRECT_CREDENTIALS: &str = "Incorrect email or password";

/// Creates a new user.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `name` - The user's name.
/// * `email` - The user's email address.
/// * `password` - The user's password.
/// * `role` - The requested role.
///
/// # Returns
///
/// A `Result` containing the created `User`.
pub async fn create_user(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    role: Role,
) -> Result<User> {
    let email = normalize_email(&email);
    tracing::debug!("🔐 Creating user: {}", email);

    let password_hash = hash_password_blocking(password).await?;

    state
        .store
        .create(NewUser {
            name: name.trim().to_string(),
            email,
            password_hash,
            role,
        })
        .await
}

/// Authenticates a user.
///
/// Unknown email and wrong password fail identically.
pub async fn authenticate_user(state: &AppState, email: String, password: String) -> Result<User> {
    let email = normalize_email(&email);
    tracing::debug!("🔐 Authenticating user: {}", email);

    let user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::Unauthorized(INCORRECT_CREDENTIALS.to_string()))?;

    if !check_password_blocking(password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized(INCORRECT_CREDENTIALS.to_string()));
    }

    tracing::info!("✅ User authenticated: {}", user.id);
    Ok(user)
}

/// Starts a password reset: stores a token digest and mails the plaintext.
///
/// If the mail cannot be sent the pending reset is cleared again.
pub async fn forgot_password(state: &AppState, email: String) -> Result<()> {
    let email = normalize_email(&email);

    let mut user = state
        .store
        .find_by_email(&email)
        .await?
        .ok_or_else(|| AppError::NotFound("There is no user with email address.".to_string()))?;

    let issued = state.reset_tokens.generate();
    user.password_reset = Some(issued.reset);
    state.store.save(&user, SaveMode::SkipValidation).await?;
    tracing::info!("🔑 Password reset requested for user: {}", user.id);

    let reset_url = format!(
        "{}/api/v1/users/resetPassword/{}",
        state.config.public_url, issued.plain
    );
    let message = Email {
        to: user.email.clone(),
        subject: format!(
            "Your password reset token (valid for {} min)",
            state.config.reset_token_ttl_minutes
        ),
        body: format!(
            "Forgot your password? Submit a PATCH request with your new password and \
             passwordConfirm to: {}.\nIf you didn't forget your password, please ignore this email!",
            reset_url
        ),
    };

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!("❌ Reset email to user {} failed: {}", user.id, e);
        user.clear_password_reset();
        state.store.save(&user, SaveMode::SkipValidation).await?;
        return Err(AppError::Server(
            "There was an error sending the email. Try again later!".to_string(),
        ));
    }

    tracing::info!("✅ Reset token sent to user: {}", user.id);
    Ok(())
}

/// Completes a password reset with the emailed token.
pub async fn reset_password(state: &AppState, token: &str, new_password: String) -> Result<User> {
    let invalid = || AppError::Validation(INVALID_RESET_TOKEN.to_string());

    let mut user = state
        .store
        .find_by_reset_token(&ResetTokens::hash(token))
        .await?
        .ok_or_else(invalid)?;

    let reset = user.password_reset.clone().ok_or_else(invalid)?;
    state
        .reset_tokens
        .matches(token, &reset.token_hash, reset.expires_at)?;

    let password_hash = hash_password_blocking(new_password).await?;
    user.set_password_hash(password_hash, Utc::now());
    user.clear_password_reset();
    state.store.save(&user, SaveMode::Validate).await?;

    tracing::info!("✅ Password reset for user: {}", user.id);
    Ok(user)
}

/// Changes the password of an authenticated user.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `user` - The user resolved by the access guard.
/// * `current_password` - The user's current password.
/// * `new_password` - The user's new password.
///
/// # Returns
///
/// A `Result` containing the updated `User`.
pub async fn change_password(
    state: &AppState,
    mut user: User,
    current_password: String,
    new_password: String,
) -> Result<User> {
    tracing::info!("🔑 Changing password for user: {}", user.id);

    if !check_password_blocking(current_password, user.password_hash.clone()).await? {
        return Err(AppError::Unauthorized(
            "Your current password is wrong.".to_string(),
        ));
    }

    let password_hash = hash_password_blocking(new_password).await?;
    user.set_password_hash(password_hash, Utc::now());
    state.store.save(&user, SaveMode::Validate).await?;

    tracing::info!("✅ Password changed for user: {}", user.id);
    Ok(user)
}
