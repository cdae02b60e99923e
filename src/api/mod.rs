//! API layer - HTTP handlers and routing
//!
//! This module contains the HTTP surface of the Keygate service:
//! - Account endpoints (register, login)
//! - The protected user-info endpoint behind the auth middleware
//! - Request tracking and tracing layers

pub mod auth;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use auth::Envelope;
pub use middleware::{AppState, AuthenticatedUser, RequestStats};

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Protected routes (need a verified bearer token)
    let protected_routes = Router::new()
        .route("/user/info", get(auth::user_info))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Public routes
    Router::new()
        .route("/account/register", post(auth::register))
        .route("/account/login", post(auth::login))
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
