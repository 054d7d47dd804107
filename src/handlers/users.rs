use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    handlers::auth::UserData,
    middleware_layer::auth::CurrentUser,
    models::user::PublicUser,
    state::AppState,
};

/// The response payload for a single user.
#[derive(Serialize, Deserialize, Debug)]
pub struct UserResponse {
    pub status: String,
    pub data: UserData,
}

fn user_response(user: PublicUser) -> Response {
    let response = UserResponse {
        status: "success".to_string(),
        data: UserData { user },
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Returns the authenticated user.
pub async fn me(Extension(current): Extension<CurrentUser>) -> Result<Response> {
    Ok(user_response(PublicUser::from(&current.user)))
}

/// Returns any user by id. Mounted behind the staff role gate.
pub async fn get_user(
    State(state): State<AppState>,
    user_id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Response> {
    let Path(user_id) = user_id?;
    let user = state
        .store
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("No user found with that ID".to_string()))?;

    Ok(user_response(PublicUser::from(&user)))
}
