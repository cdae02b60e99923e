//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
///
/// The username is unique and immutable after registration. Passwords are
/// stored only as Argon2id hashes; the hash field is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier, assigned by the store on creation
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Registration timestamp
    pub register_time: DateTime<Utc>,
    /// Last successful login timestamp
    pub last_login_time: DateTime<Utc>,
}

impl User {
    /// Create a new User with the given username and password hash.
    ///
    /// The password must already be hashed before calling this function;
    /// use `services::password::hash_password()`.
    pub fn new(username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0, // Will be set by the database
            username,
            password_hash,
            register_time: now,
            last_login_time: now,
        }
    }
}
