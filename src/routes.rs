use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, patch, post},
};
use tower_cookies::CookieManagerLayer;

use crate::{
    handlers,
    middleware_layer::{
        auth::require_auth,
        roles::{restrict_to, STAFF},
    },
    state::AppState,
};

/// Builds the API router.
///
/// Transport concerns (tracing, CORS, rate limiting) are layered on by the
/// binary so the router can be driven directly in tests.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/users/signup", post(handlers::auth::signup))
        .route("/api/v1/users/login", post(handlers::auth::login))
        .route("/api/v1/users/logout", get(handlers::auth::logout))
        .route(
            "/api/v1/users/forgotPassword",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/v1/users/resetPassword/{token}",
            patch(handlers::auth::reset_password),
        )
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/v1/users/me", get(handlers::users::me))
        .route(
            "/api/v1/users/updateMyPassword",
            patch(handlers::auth::update_password),
        )
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state.clone());

    let staff_routes = Router::new()
        .route("/api/v1/users/{id}", get(handlers::users::get_user))
        .route_layer(from_fn_with_state(STAFF, restrict_to))
        .route_layer(from_fn_with_state(state.clone(), require_auth))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(staff_routes)
        .layer(CookieManagerLayer::new())
}
