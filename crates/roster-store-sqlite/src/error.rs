//! Error type for `roster-store-sqlite`.

use roster_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The patch or new record failed validation. Kept as a distinct source so
  /// callers can tell client mistakes from storage faults.
  #[error("validation failed: {0}")]
  Validation(#[from] ValidationError),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
