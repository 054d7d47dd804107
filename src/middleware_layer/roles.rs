use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, Result},
    middleware_layer::auth::{CurrentUser, GuardRejection},
    models::user::{Role, User},
};

/// Roles allowed to look up other users.
pub const STAFF: &[Role] = &[Role::Admin, Role::LeadGuide];

/// Fails with 403 unless `user` holds one of the `allowed` roles.
pub fn allow(user: &User, allowed: &[Role]) -> Result<()> {
    if allowed.contains(&user.role) {
        return Ok(());
    }

    Err(AppError::Forbidden(
        "You do not have permission to perform this action".to_string(),
    ))
}

/// A middleware restricting a route to a set of roles.
///
/// Must sit inside `require_auth`; a request without a `CurrentUser` is
/// treated as not logged in.
pub async fn restrict_to(
    State(allowed): State<&'static [Role]>,
    request: Request<Body>,
    next: Next,
) -> Result<Response> {
    let current = request
        .extensions()
        .get::<CurrentUser>()
        .ok_or(GuardRejection::NoToken)?;

    allow(&current.user, allowed)?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user_with(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Role Holder".to_string(),
            email: "role@example.com".to_string(),
            password_hash: "$argon2id$placeholder".to_string(),
            role,
            password_changed_at: None,
            password_reset: None,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_allowed_role_passes() {
        assert!(allow(&user_with(Role::Admin), &[Role::Admin, Role::LeadGuide]).is_ok());
        assert!(allow(&user_with(Role::LeadGuide), STAFF).is_ok());
    }

    #[test]
    fn test_other_role_is_forbidden() {
        let err = allow(&user_with(Role::User), &[Role::Admin]).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);

        assert!(allow(&user_with(Role::Guide), STAFF).is_err());
        assert!(allow(&user_with(Role::Admin), &[]).is_err());
    }
}
