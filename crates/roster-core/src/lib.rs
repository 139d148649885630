//! Core types and trait definitions for the Roster user service.
//!
//! Free of HTTP and database dependencies; every other crate builds on it.

pub mod error;
pub mod filter;
pub mod slot;
pub mod store;
pub mod user;

pub use error::ValidationError;
pub use user::{Identity, User, UserId, UserPatch};

/// The raw, client-supplied payload of a request: an insertion-ordered map of
/// string keys to arbitrary JSON values.
///
/// Never forwarded to storage as-is; see [`filter::filter_fields`].
pub type AttributeBag = serde_json::Map<String, serde_json::Value>;
