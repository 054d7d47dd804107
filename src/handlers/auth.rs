use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_cookies::cookie::time::Duration;
use tower_cookies::{Cookie, Cookies};

use crate::{
    error::Result,
    middleware_layer::auth::{CurrentUser, TOKEN_COOKIE},
    models::user::{PublicUser, Role, User},
    services::auth as auth_service,
    state::AppState,
    validation::auth::{require_credentials, validate_payload},
};

/// The request payload for user signup.
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    #[garde(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[garde(email)]
    pub email: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(matches(password))]
    pub password_confirm: String,
    #[serde(default)]
    #[garde(skip)]
    pub role: Role,
}

/// The request payload for user login.
#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// The request payload for starting a password reset.
#[derive(Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

/// The request payload for choosing a new password.
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(matches(password))]
    pub password_confirm: String,
}

/// The request payload for changing a known password.
#[derive(Deserialize, Validate, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub password_current: String,
    #[serde(default)]
    #[garde(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    #[garde(matches(password))]
    pub password_confirm: String,
}

/// The `data` member of user-bearing responses.
#[derive(Serialize, Deserialize, Debug)]
pub struct UserData {
    pub user: PublicUser,
}

/// The response payload for flows that issue a session token.
#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub status: String,
    pub token: String,
    pub data: UserData,
}

/// The response payload for flows that only report an outcome.
#[derive(Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub status: String,
    pub message: String,
}

/// Creates the session cookie with the given value and max age.
fn create_token_cookie(value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(TOKEN_COOKIE, value);
    cookie.set_http_only(true);
    if secure {
        cookie.set_secure(true);
    }
    cookie.set_same_site(tower_cookies::cookie::SameSite::Lax);
    cookie.set_max_age(max_age);
    cookie.set_path("/");
    cookie
}

/// Issues a token for `user`, sets the cookie and builds the response.
fn send_token(state: &AppState, cookies: &Cookies, user: &User, status: StatusCode) -> Result<Response> {
    let token = state.tokens.issue(user.id)?;

    cookies.add(create_token_cookie(
        token.clone(),
        Duration::days(state.config.jwt_cookie_expires_in_days),
        state.config.secure_cookies,
    ));

    let response = TokenResponse {
        status: "success".to_string(),
        token,
        data: UserData {
            user: PublicUser::from(user),
        },
    };

    Ok((status, Json(response)).into_response())
}

/// Handles user signup.
pub async fn signup(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(mut payload) = payload?;
    tracing::info!("📝 Signup attempt for: {}", payload.email);
    // The stored name is trimmed, so the length rule must see the trimmed value.
    payload.name = payload.name.trim().to_string();
    validate_payload(&payload)?;

    let user = auth_service::create_user(
        &state,
        payload.name,
        payload.email,
        payload.password,
        payload.role,
    )
    .await?;

    tracing::info!("✅ User signed up: {}", user.id);
    send_token(&state, &cookies, &user, StatusCode::CREATED)
}

/// Handles user login.
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    payload: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    tracing::info!("🔐 Login attempt for: {}", payload.email);
    require_credentials(&payload.email, &payload.password)?;

    let user = auth_service::authenticate_user(&state, payload.email, payload.password).await?;

    tracing::info!("✅ User logged in: {}", user.id);
    send_token(&state, &cookies, &user, StatusCode::OK)
}

/// Handles logout by overwriting the session cookie.
pub async fn logout(State(state): State<AppState>, cookies: Cookies) -> Result<Response> {
    cookies.add(create_token_cookie(
        "loggedout".to_string(),
        Duration::seconds(10),
        state.config.secure_cookies,
    ));

    tracing::info!("👋 Session cookie cleared");
    Ok((StatusCode::OK, Json(sonic_rs::json!({ "status": "success" }))).into_response())
}

/// Handles the first step of a password reset.
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ForgotPasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;

    auth_service::forgot_password(&state, payload.email).await?;

    let response = MessageResponse {
        status: "success".to_string(),
        message: "Token sent to email!".to_string(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Handles choosing a new password with an emailed reset token.
///
/// The user is logged in with a fresh token on success.
pub async fn reset_password(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(token): Path<String>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    validate_payload(&payload)?;

    let user = auth_service::reset_password(&state, &token, payload.password).await?;
    send_token(&state, &cookies, &user, StatusCode::OK)
}

/// Handles changing the current user's password.
pub async fn update_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    cookies: Cookies,
    payload: std::result::Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(payload) = payload?;
    validate_payload(&payload)?;

    let user = auth_service::change_password(
        &state,
        current.user,
        payload.password_current,
        payload.password,
    )
    .await?;

    send_token(&state, &cookies, &user, StatusCode::OK)
}
