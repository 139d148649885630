//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings.

use chrono::{DateTime, Utc};
use roster_core::{User, UserId};

use crate::{Error, Result};

/// Column list matching the field order of [`RawUser`].
pub const USER_COLUMNS: &str =
  "id, name, email, photo, cv, licensed_id, active, created_at, updated_at";

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub id:          i64,
  pub name:        String,
  pub email:       String,
  pub photo:       Option<String>,
  pub cv:          Option<String>,
  pub licensed_id: Option<String>,
  pub active:      bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawUser {
  /// Read a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawUser {
      id:          row.get(0)?,
      name:        row.get(1)?,
      email:       row.get(2)?,
      photo:       row.get(3)?,
      cv:          row.get(4)?,
      licensed_id: row.get(5)?,
      active:      row.get(6)?,
      created_at:  row.get(7)?,
      updated_at:  row.get(8)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:          UserId(self.id),
      name:        self.name,
      email:       self.email,
      photo:       self.photo,
      cv:          self.cv,
      licensed_id: self.licensed_id,
      active:      self.active,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// True if `err` is SQLite refusing a write because of a UNIQUE (or other)
/// constraint. The only constraint on `users` that updates can hit is the
/// email uniqueness.
pub fn is_constraint_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}
