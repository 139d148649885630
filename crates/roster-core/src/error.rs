//! Error types for `roster-core`.

use thiserror::Error;

/// A patch was rejected because one of its fields is malformed.
///
/// Storage backends wrap this in their own error type; the HTTP layer looks
/// for it in the `source()` chain to answer with a client error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("field `{field}` must be {expected}")]
  InvalidType {
    field:    String,
    expected: &'static str,
  },

  #[error("field `{0}` cannot be updated")]
  UnknownField(String),

  #[error("please provide your name")]
  EmptyName,

  #[error("name must be at most {max} characters")]
  NameTooLong { max: usize },

  #[error("please provide a valid email, got {0:?}")]
  InvalidEmail(String),

  #[error("email {0:?} is already in use")]
  DuplicateEmail(String),
}
