//! Session service
//!
//! Implements the credential-to-session pipeline:
//! - Registration (unique username, Argon2id-hashed password)
//! - Login: credential verification, then cache-aside token issuance
//! - Token-to-identity resolution for protected endpoints
//! - Profile lookup by resolved identity
//!
//! The live token for a user is owned by the external cache under the key
//! `userid:<id>`; storing a new token supersedes the previous one, and the
//! cache TTL is derived from the same expiry instant embedded in the token.

use crate::cache::TokenCache;
use crate::db::repositories::UserRepository;
use crate::models::User;
use crate::services::password::verify_password;
use crate::services::token::{TokenCodec, TokenError};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Wire code for a successful response
pub const CODE_OK: u32 = 200;

/// Error types for session service operations.
///
/// Every caller-visible condition is a typed value with a stable wire code;
/// underlying store/cache failures are carried as opaque sources and never
/// shown to clients.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Opaque durable-store I/O or integrity failure
    #[error("database error")]
    Store(#[source] anyhow::Error),

    /// Register on a username that already exists
    #[error("user already registered")]
    AlreadyRegistered,

    /// Unknown username or wrong password, deliberately indistinguishable
    #[error("invalid username or password")]
    CredentialsInvalid,

    /// Signing failure or an invalid/expired inbound token
    #[error("token error")]
    Token(#[source] TokenError),

    /// A valid token whose user row no longer exists
    #[error("invalid session")]
    UnknownIdentity,

    /// Opaque cache I/O failure
    #[error("cache error")]
    Cache(#[source] anyhow::Error),
}

impl AuthError {
    /// Stable wire code for the error envelope.
    ///
    /// The numeric values are load-bearing for existing clients.
    pub fn code(&self) -> u32 {
        match self {
            AuthError::Store(_) => 10000,
            AuthError::AlreadyRegistered => 10100,
            AuthError::CredentialsInvalid => 10101,
            AuthError::Token(_) | AuthError::UnknownIdentity => 10102,
            AuthError::Cache(_) => 10103,
        }
    }
}

/// Session service composing the credential store, the token cache, and the
/// token codec.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    cache: Arc<dyn TokenCache>,
    codec: TokenCodec,
    token_ttl_seconds: i64,
}

impl SessionService {
    /// Create a new session service.
    ///
    /// `token_ttl_seconds` drives both the token's embedded expiry and the
    /// cache TTL.
    pub fn new(
        users: Arc<dyn UserRepository>,
        cache: Arc<dyn TokenCache>,
        codec: TokenCodec,
        token_ttl_seconds: i64,
    ) -> Self {
        Self {
            users,
            cache,
            codec,
            token_ttl_seconds,
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// - `AlreadyRegistered` if the username is taken
    /// - `Store` for database failures
    pub async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let existing = self
            .users
            .get_by_username(username)
            .await
            .map_err(AuthError::Store)?;

        if existing.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let password_hash = crate::services::password::hash_password(password)
            .context("Failed to hash password")
            .map_err(AuthError::Store)?;

        let user = User::new(username.to_string(), password_hash);
        self.users.create(&user).await.map_err(AuthError::Store)?;

        tracing::info!(username, "user registered");
        Ok(())
    }

    /// Login with credentials, returning a bearer token.
    ///
    /// Cache-aside: a cached token for the user is returned verbatim without
    /// re-verification through the codec; the cache TTL, written from the
    /// same expiry instant the token embeds, is the staleness guard. On a
    /// miss a fresh token is issued and stored.
    ///
    /// # Errors
    ///
    /// - `CredentialsInvalid` for an unknown username or a wrong password,
    ///   identical in shape so callers cannot probe for registered names
    /// - `Store` / `Cache` for infrastructure failures
    /// - `Token` if signing fails
    pub async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let user = self
            .users
            .get_by_username(username)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::CredentialsInvalid)?;

        let password_valid =
            verify_password(password, &user.password_hash).map_err(AuthError::Store)?;
        if !password_valid {
            return Err(AuthError::CredentialsInvalid);
        }

        let now = Utc::now();
        self.users
            .update_last_login(user.id, now)
            .await
            .map_err(AuthError::Store)?;

        let key = cache_key(user.id);
        let cached = self.cache.get(&key).await.map_err(AuthError::Cache)?;
        // The original cache client reports an absent key as "", so both
        // shapes count as a miss.
        if let Some(token) = cached.filter(|t| !t.is_empty()) {
            tracing::debug!(user_id = user.id, "login served from token cache");
            return Ok(token);
        }

        // One expiry instant feeds both the token claim and the cache TTL.
        let issued_at = now.timestamp();
        let expires_at = issued_at + self.token_ttl_seconds;

        let token = self
            .codec
            .issue(issued_at, expires_at, user.id)
            .map_err(AuthError::Token)?;

        self.cache
            .set_with_ttl(
                &key,
                &token,
                Duration::from_secs((expires_at - issued_at) as u64),
            )
            .await
            .map_err(AuthError::Cache)?;

        tracing::debug!(user_id = user.id, "issued new session token");
        Ok(token)
    }

    /// Resolve an inbound bearer token to the numeric user id it was issued
    /// for.
    ///
    /// # Errors
    ///
    /// - `Token` if the signature is invalid or the token has expired
    pub fn resolve_identity(&self, token: &str) -> Result<i64, AuthError> {
        let claims = self.codec.verify(token).map_err(AuthError::Token)?;
        Ok(claims.user_id)
    }

    /// Fetch the profile for a resolved identity.
    ///
    /// # Errors
    ///
    /// - `UnknownIdentity` if no user row backs the id, including rows
    ///   deleted after the token was issued: a profile-less token is an
    ///   invalid session from the caller's perspective
    /// - `Store` for database failures
    pub async fn get_user_profile(&self, user_id: i64) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await
            .map_err(AuthError::Store)?
            .ok_or(AuthError::UnknownIdentity)
    }
}

/// Cache key for a user's live token
fn cache_key(user_id: i64) -> String {
    format!("userid:{}", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryTokenCache;
    use crate::db::repositories::SqlxUserRepository;
    use crate::db::{create_test_pool, migrations};
    use async_trait::async_trait;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    async fn setup_service(ttl_seconds: i64) -> (Arc<dyn UserRepository>, SessionService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::boxed(pool);
        let cache = Arc::new(MemoryTokenCache::new());
        let codec = TokenCodec::new(SECRET).expect("codec");
        let service = SessionService::new(users.clone(), cache, codec, ttl_seconds);

        (users, service)
    }

    fn verify_claims(token: &str) -> crate::services::token::Claims {
        TokenCodec::new(SECRET)
            .expect("codec")
            .verify(token)
            .expect("token should verify")
    }

    // ========================================================================
    // Registration
    // ========================================================================

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let (users, service) = setup_service(3600).await;

        service
            .register("alice", "pw1")
            .await
            .expect("first registration should succeed");

        let result = service.register("alice", "pw2").await;
        assert!(matches!(result, Err(AuthError::AlreadyRegistered)));

        // Exactly one row for the username
        let count = users.count().await.expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let (users, service) = setup_service(3600).await;

        service.register("alice", "pw1").await.expect("register");

        let user = users
            .get_by_username("alice")
            .await
            .expect("lookup")
            .expect("user exists");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_ne!(user.password_hash, "pw1");
    }

    // ========================================================================
    // Login
    // ========================================================================

    #[tokio::test]
    async fn test_login_issues_token_bound_to_user() {
        let (users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");
        let user = users
            .get_by_username("alice")
            .await
            .expect("lookup")
            .expect("user exists");

        let before = Utc::now().timestamp();
        let token = service.login("alice", "pw1").await.expect("login");
        let after = Utc::now().timestamp();

        let claims = verify_claims(&token);
        assert_eq!(claims.user_id, user.id);
        assert!(claims.exp >= before + 3600 && claims.exp <= after + 3600);
        assert_eq!(claims.exp - claims.time_stamp, 3600);
    }

    #[tokio::test]
    async fn test_login_wrong_password_matches_unknown_user_shape() {
        let (_users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");

        let wrong_password = service.login("alice", "wrong").await;
        let unknown_user = service.login("nobody", "whatever").await;

        assert!(matches!(wrong_password, Err(AuthError::CredentialsInvalid)));
        assert!(matches!(unknown_user, Err(AuthError::CredentialsInvalid)));
    }

    #[tokio::test]
    async fn test_login_warm_cache_returns_token_verbatim() {
        let (_users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");

        let first = service.login("alice", "pw1").await.expect("first login");
        let second = service.login("alice", "pw1").await.expect("second login");

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_login_reissues_after_cache_ttl_elapses() {
        let (_users, service) = setup_service(1).await;
        service.register("alice", "pw1").await.expect("register");

        let first = service.login("alice", "pw1").await.expect("first login");

        tokio::time::sleep(Duration::from_millis(1600)).await;

        let second = service.login("alice", "pw1").await.expect("second login");
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_login_refreshes_last_login_time() {
        let (users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");
        let registered = users
            .get_by_username("alice")
            .await
            .expect("lookup")
            .expect("user exists");

        tokio::time::sleep(Duration::from_millis(20)).await;
        service.login("alice", "pw1").await.expect("login");

        let after_login = users
            .get_by_username("alice")
            .await
            .expect("lookup")
            .expect("user exists");
        assert!(after_login.last_login_time > registered.last_login_time);
        assert_eq!(after_login.register_time, registered.register_time);
    }

    #[tokio::test]
    async fn test_login_cache_failure_surfaces_as_cache_error() {
        struct FailingCache;

        #[async_trait]
        impl TokenCache for FailingCache {
            async fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
                Err(anyhow::anyhow!("connection refused"))
            }

            async fn set_with_ttl(
                &self,
                _key: &str,
                _value: &str,
                _ttl: Duration,
            ) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("connection refused"))
            }
        }

        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");
        let users = SqlxUserRepository::boxed(pool);
        let codec = TokenCodec::new(SECRET).expect("codec");
        let service = SessionService::new(users, Arc::new(FailingCache), codec, 3600);

        service.register("alice", "pw1").await.expect("register");
        let result = service.login("alice", "pw1").await;

        assert!(matches!(result, Err(AuthError::Cache(_))));
    }

    // ========================================================================
    // Identity resolution and profile
    // ========================================================================

    #[tokio::test]
    async fn test_resolve_identity_round_trip() {
        let (users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");
        let user = users
            .get_by_username("alice")
            .await
            .expect("lookup")
            .expect("user exists");

        let token = service.login("alice", "pw1").await.expect("login");
        let user_id = service.resolve_identity(&token).expect("resolve");

        assert_eq!(user_id, user.id);

        let profile = service.get_user_profile(user_id).await.expect("profile");
        assert_eq!(profile.id, user.id);
        assert_eq!(profile.username, "alice");
    }

    #[tokio::test]
    async fn test_resolve_identity_rejects_garbage() {
        let (_users, service) = setup_service(3600).await;

        let result = service.resolve_identity("not-a-token");
        assert!(matches!(result, Err(AuthError::Token(_))));
    }

    #[tokio::test]
    async fn test_profile_for_deleted_user_is_invalid_session() {
        let (users, service) = setup_service(3600).await;
        service.register("alice", "pw1").await.expect("register");

        let token = service.login("alice", "pw1").await.expect("login");
        let user_id = service.resolve_identity(&token).expect("resolve");

        users.delete(user_id).await.expect("delete");

        let result = service.get_user_profile(user_id).await;
        assert!(matches!(result, Err(AuthError::UnknownIdentity)));
        assert_eq!(result.unwrap_err().code(), 10102);
    }

    // ========================================================================
    // The full lifecycle
    // ========================================================================

    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let (_users, service) = setup_service(1).await;

        service.register("alice", "pw1").await.expect("register");
        assert!(matches!(
            service.register("alice", "pw2").await,
            Err(AuthError::AlreadyRegistered)
        ));
        assert!(matches!(
            service.login("alice", "wrong").await,
            Err(AuthError::CredentialsInvalid)
        ));

        let t1 = service.login("alice", "pw1").await.expect("login");
        let t1_again = service.login("alice", "pw1").await.expect("cache hit");
        assert_eq!(t1, t1_again);

        tokio::time::sleep(Duration::from_millis(1600)).await;

        let t2 = service.login("alice", "pw1").await.expect("reissue");
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_error_codes_are_wire_stable() {
        assert_eq!(
            AuthError::Store(anyhow::anyhow!("io")).code(),
            10000
        );
        assert_eq!(AuthError::AlreadyRegistered.code(), 10100);
        assert_eq!(AuthError::CredentialsInvalid.code(), 10101);
        assert_eq!(AuthError::Token(TokenError::Expired).code(), 10102);
        assert_eq!(AuthError::UnknownIdentity.code(), 10102);
        assert_eq!(
            AuthError::Cache(anyhow::anyhow!("io")).code(),
            10103
        );
    }
}
