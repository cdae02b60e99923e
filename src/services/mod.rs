//! Services layer - Business logic
//!
//! This module contains the business logic for the Keygate service:
//! - Password hashing and verification
//! - Token signing and verification
//! - The session service composing store, cache, and codec

pub mod password;
pub mod session;
pub mod token;

pub use password::{hash_password, verify_password};
pub use session::{AuthError, SessionService};
pub use token::{Claims, TokenCodec, TokenError};
