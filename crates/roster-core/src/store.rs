//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `roster-store-sqlite`).
//! Higher layers (`roster-api`, `roster-server`) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use crate::user::{User, UserId, UserPatch};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`RecordStore::query`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
  /// Exact, case-insensitive email match.
  pub email:  Option<String>,
  pub active: Option<bool>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// Options for [`RecordStore::update_by_id`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
  /// Run [`UserPatch::validate`] before writing. A failure must surface as
  /// a [`ValidationError`](crate::ValidationError) in the error's source
  /// chain.
  pub validate: bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a user record store.
///
/// Records are never created or hard-deleted through this trait; account
/// lifecycle is owned by the backend and its administrators.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a record by id, active or not. Returns `None` if not found.
  fn find_by_id(
    &self,
    id: UserId,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Apply `patch` to the record `id` and return the post-update record.
  ///
  /// Returns `None` if no such record exists. An empty patch is not an
  /// error; it returns the record unchanged.
  fn update_by_id(
    &self,
    id: UserId,
    patch: UserPatch,
    options: UpdateOptions,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// List records matching `filter`, ordered by id.
  fn query<'a>(
    &'a self,
    filter: &'a UserFilter,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;
}
