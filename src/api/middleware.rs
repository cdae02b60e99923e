//! API middleware
//!
//! Contains middleware for:
//! - Authentication (bearer-token verification at the boundary)
//! - Request statistics (lock-free atomic counters)
//!
//! The auth middleware is where a raw token becomes a typed identity: it
//! verifies the signature and expiry through the session service and
//! attaches the resolved numeric user id to the request as an
//! `AuthenticatedUser` extension. Handlers downstream never see the raw
//! token or an untyped claim.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::api::auth::Envelope;
use crate::services::session::{AuthError, SessionService};

/// Lightweight request statistics using atomic operations (no locks)
pub struct RequestStats {
    /// Total number of requests processed
    total_requests: AtomicU64,
    /// Total response time in microseconds (for calculating average)
    total_response_time_us: AtomicU64,
    /// Application start time
    start_time: Instant,
}

impl RequestStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_response_time_us: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a request with its response time
    pub fn record(&self, duration_us: u64) -> u64 {
        let count = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;
        self.total_response_time_us
            .fetch_add(duration_us, Ordering::Relaxed);
        count
    }

    /// Get total request count
    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    /// Get average response time in microseconds
    pub fn avg_response_time_us(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let total_time = self.total_response_time_us.load(Ordering::Relaxed);
        total_time as f64 / total as f64
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub request_stats: Arc<RequestStats>,
}

/// The resolved numeric user id of an authenticated request
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub i64);

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        // Only present when the auth middleware ran and verified the token
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::UnknownIdentity)
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<String> {
    let auth_header = request.headers().get(header::AUTHORIZATION)?;
    let auth_str = auth_header.to_str().ok()?;
    auth_str.strip_prefix("Bearer ").map(str::to_string)
}

/// Authentication middleware
///
/// Verifies the inbound bearer token and attaches the resolved identity to
/// the request. A missing, invalid, or expired token is answered with the
/// token-error envelope.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = extract_bearer_token(&request).ok_or(AuthError::Token(
        crate::services::token::TokenError::Invalid(
            jsonwebtoken::errors::ErrorKind::InvalidToken.into(),
        ),
    ))?;

    let user_id = state.sessions.resolve_identity(&token)?;

    request.extensions_mut().insert(AuthenticatedUser(user_id));
    Ok(next.run(request).await)
}

/// Request tracking middleware
///
/// Counts every request and its latency in the shared `RequestStats`.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let elapsed = started.elapsed();
    let count = state.request_stats.record(elapsed.as_micros() as u64);
    tracing::debug!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_us = elapsed.as_micros() as u64,
        request_number = count,
        "request handled"
    );

    response
}

impl axum::response::IntoResponse for AuthError {
    /// Domain failures keep HTTP 200 and carry their wire code in the
    /// envelope; clients dispatch on `code`, not on the HTTP status.
    fn into_response(self) -> Response {
        tracing::warn!(code = self.code(), error = %self, "request failed");
        axum::Json(Envelope::<()>::fail(self.code(), self.to_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_stats_record() {
        let stats = RequestStats::new();

        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.avg_response_time_us(), 0.0);

        stats.record(100);
        stats.record(300);

        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.avg_response_time_us(), 200.0);
    }

    #[test]
    fn test_request_stats_returns_running_count() {
        let stats = RequestStats::new();

        assert_eq!(stats.record(10), 1);
        assert_eq!(stats.record(10), 2);
        assert_eq!(stats.record(10), 3);
    }
}
