//! Data models
//!
//! This module contains the data structures used throughout the Keygate
//! service. The only persistent entity is the user account; session tokens
//! are derived values and never stored as records.

mod user;

pub use user::User;
