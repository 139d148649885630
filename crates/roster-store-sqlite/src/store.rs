//! [`SqliteStore`]: the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value as SqlValue};
use roster_core::{
  User, UserId, UserPatch, ValidationError,
  store::{RecordStore, UpdateOptions, UserFilter},
};

use crate::{
  Error, Result,
  encode::{RawUser, USER_COLUMNS, encode_dt, is_constraint_violation},
  schema::SCHEMA,
};

/// Input for [`SqliteStore::create_user`]. Account creation belongs to the
/// operator tooling, not to the self-service API.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  /// Argon2 PHC string.
  pub password_hash: String,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Roster user store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a new, active account. Name and email are validated and
  /// canonicalised the same way a self-service patch is.
  pub async fn create_user(&self, input: NewUser) -> Result<User> {
    let mut checked = UserPatch {
      name: Some(input.name),
      email: Some(input.email),
      ..UserPatch::default()
    };
    checked.validate()?;
    let name = checked.name.unwrap_or_default();
    let email = checked.email.unwrap_or_default();

    let now = encode_dt(Utc::now());
    let hash = input.password_hash;
    let email_for_insert = email.clone();

    let raw = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (name, email, password_hash, active, created_at, updated_at)
           VALUES (?1, ?2, ?3, 1, ?4, ?4)",
          rusqlite::params![name, email_for_insert, hash, now],
        )?;
        let id = conn.last_insert_rowid();
        let raw = conn.query_row(
          &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
          rusqlite::params![id],
          RawUser::from_row,
        )?;
        Ok(raw)
      })
      .await
      .map_err(|e| {
        if is_constraint_violation(&e) {
          Error::Validation(ValidationError::DuplicateEmail(email))
        } else {
          Error::Database(e)
        }
      })?;

    let user = raw.into_user()?;
    tracing::info!(user_id = %user.id, "created user");
    Ok(user)
  }

  /// The stored argon2 hash for `id`, for use by the authentication layer.
  pub async fn password_hash(&self, id: UserId) -> Result<Option<String>> {
    let hash = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT password_hash FROM users WHERE id = ?1",
              rusqlite::params![id.0],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(hash)
  }
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = Error;

  async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
              rusqlite::params![id.0],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn update_by_id(
    &self,
    id: UserId,
    mut patch: UserPatch,
    options: UpdateOptions,
  ) -> Result<Option<User>> {
    if options.validate {
      patch.validate()?;
    }
    if patch.is_empty() {
      return self.find_by_id(id).await;
    }

    let attempted_email = patch.email.clone();

    // Column names come from this fixed list only; values are bound.
    let mut columns: Vec<&'static str> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    let text_fields = [
      ("name", patch.name),
      ("email", patch.email),
      ("photo", patch.photo),
      ("cv", patch.cv),
      ("licensed_id", patch.licensed_id),
    ];
    for (column, value) in text_fields {
      if let Some(v) = value {
        columns.push(column);
        values.push(SqlValue::Text(v));
      }
    }
    if let Some(active) = patch.active {
      columns.push("active");
      values.push(SqlValue::Integer(i64::from(active)));
    }
    columns.push("updated_at");
    values.push(SqlValue::Text(encode_dt(Utc::now())));

    let assignments = columns
      .iter()
      .enumerate()
      .map(|(i, column)| format!("{column} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE users SET {assignments} WHERE id = ?{}",
      columns.len() + 1
    );
    values.push(SqlValue::Integer(id.0));

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(&sql, rusqlite::params_from_iter(values))?;
        let raw = if changed == 0 {
          None
        } else {
          Some(tx.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            rusqlite::params![id.0],
            RawUser::from_row,
          )?)
        };
        tx.commit()?;
        Ok(raw)
      })
      .await
      .map_err(|e| match attempted_email {
        Some(email) if is_constraint_violation(&e) => {
          Error::Validation(ValidationError::DuplicateEmail(email))
        }
        _ => Error::Database(e),
      })?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn query(&self, filter: &UserFilter) -> Result<Vec<User>> {
    let email = filter.email.as_deref().map(|e| e.trim().to_lowercase());
    let active = filter.active.map(i64::from);
    let limit_val = filter.limit.map_or(-1, |l| l as i64);
    let offset_val = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<&'static str> = vec![];
        if email.is_some() {
          conds.push("email = ?1");
        }
        if active.is_some() {
          conds.push("active = ?2");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {USER_COLUMNS}
           FROM users
           {where_clause}
           ORDER BY id
           LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![email.as_deref(), active, limit_val, offset_val],
            RawUser::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }
}
