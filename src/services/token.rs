//! Session token codec
//!
//! Signs and verifies the compact, expiring tokens handed out at login.
//! Tokens are HS256-signed JWTs carrying three claims: the expiry instant
//! (`exp`), the issue instant (`timeStamp`), and the owning user's id
//! (`userId`). Verification rejects bad signatures and expired tokens as
//! distinct conditions so callers can tell a forged token from a stale one.

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};

/// Minimum signing secret length in bytes.
///
/// HS256 keys shorter than the SHA-256 output size weaken the MAC, so the
/// codec refuses to be built with one.
pub const MIN_SECRET_BYTES: usize = 32;

/// Claims embedded in a session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry instant, unix seconds
    pub exp: i64,
    /// Issue instant, unix seconds
    #[serde(rename = "timeStamp")]
    pub time_stamp: i64,
    /// Owning user's id
    #[serde(rename = "userId")]
    pub user_id: i64,
}

/// Error type for token operations
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The signing secret is below the minimum key strength
    #[error("signing secret must be at least {MIN_SECRET_BYTES} bytes, got {0}")]
    SecretTooShort(usize),

    /// Signing failed
    #[error("token signing failed")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The token's embedded expiry has passed
    #[error("token expired")]
    Expired,

    /// The signature does not match or the token is unparseable
    #[error("invalid token")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Codec for issuing and verifying session tokens.
///
/// Holds the symmetric key material once, so call sites never touch the raw
/// secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    /// Create a codec from the configured signing secret.
    ///
    /// Fails with `SecretTooShort` if the secret is below [`MIN_SECRET_BYTES`].
    pub fn new(secret: &str) -> Result<Self, TokenError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(TokenError::SecretTooShort(secret.len()));
        }

        let validation = Validation::new(Algorithm::HS256);

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Issue a signed token for `user_id`.
    ///
    /// The caller computes `expires_at` once and derives the cache TTL from
    /// the same instant, which keeps the cache window and the token's own
    /// validity window in sync.
    pub fn issue(
        &self,
        issued_at: i64,
        expires_at: i64,
        user_id: i64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            exp: expires_at,
            time_stamp: issued_at,
            user_id,
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Verify a token and return its claims.
    ///
    /// An expired token fails with `Expired`; a tampered or unparseable one
    /// fails with `Invalid`. Expiry checking uses the standard 60-second
    /// leeway for clock skew.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn codec() -> TokenCodec {
        TokenCodec::new(SECRET).expect("codec")
    }

    #[test]
    fn test_short_secret_rejected() {
        let result = TokenCodec::new("too-short");
        assert!(matches!(result, Err(TokenError::SecretTooShort(9))));
    }

    #[test]
    fn test_issue_verify_round_trip() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let token = codec.issue(now, now + 3600, 42).expect("issue");
        let claims = codec.verify(&token).expect("verify");

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.time_stamp, now);
        assert_eq!(claims.exp, now + 3600);
    }

    #[test]
    fn test_expired_token_fails_distinctly() {
        let codec = codec();
        let now = Utc::now().timestamp();

        // Well past the verification leeway
        let token = codec.issue(now - 7200, now - 3600, 42).expect("issue");
        let err = codec.verify(&token).unwrap_err();

        assert!(matches!(err, TokenError::Expired));
    }

    #[test]
    fn test_tampered_token_fails_as_invalid() {
        let codec = codec();
        let now = Utc::now().timestamp();

        let token = codec.issue(now, now + 3600, 42).expect("issue");
        // Flip the first character of the signature segment
        let sig_start = token.rfind('.').expect("jwt has a signature") + 1;
        let mut tampered: Vec<char> = token.chars().collect();
        tampered[sig_start] = if tampered[sig_start] == 'A' { 'B' } else { 'A' };
        let tampered: String = tampered.into_iter().collect();

        let err = codec.verify(&tampered).unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_wrong_secret_fails_as_invalid() {
        let codec_a = codec();
        let codec_b = TokenCodec::new("fedcba9876543210fedcba9876543210").expect("codec");
        let now = Utc::now().timestamp();

        let token = codec_a.issue(now, now + 3600, 42).expect("issue");
        let err = codec_b.verify(&token).unwrap_err();

        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_garbage_token_fails_as_invalid() {
        let err = codec().verify("not.a.token").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn test_claims_wire_names() {
        let claims = Claims {
            exp: 1,
            time_stamp: 2,
            user_id: 3,
        };
        let json = serde_json::to_string(&claims).unwrap();

        assert!(json.contains("\"timeStamp\":2"));
        assert!(json.contains("\"userId\":3"));
    }
}
