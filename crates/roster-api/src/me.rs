//! Handlers for the caller's own account.
//!
//! | Method   | Path  | Notes |
//! |----------|-------|-------|
//! | `GET`    | `/me` | The caller's record |
//! | `PATCH`  | `/me` | JSON or multipart; `name`, `email`, files `photo`, `cv`, `licensedID` |
//! | `DELETE` | `/me` | Soft delete; 204 |

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use roster_core::{
  User, UserPatch,
  filter::{SELF_SERVICE_FIELDS, contains_forbidden, filter_fields},
  store::{RecordStore, UpdateOptions},
};
use serde::Serialize;

use crate::{ApiState, Caller, error::ApiError, upload::ProfileForm};

/// Success envelope: `{"status":"success","data":{"user":{...}}}`.
#[derive(Debug, Serialize)]
pub struct UserResponse {
  pub status: &'static str,
  pub data:   UserData,
}

#[derive(Debug, Serialize)]
pub struct UserData {
  pub user: User,
}

impl From<User> for UserResponse {
  fn from(user: User) -> Self {
    Self {
      status: "success",
      data:   UserData { user },
    }
  }
}

// ─── Get ─────────────────────────────────────────────────────────────────────

/// `GET /me`
pub async fn get_me<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<Json<UserResponse>, ApiError>
where
  S: RecordStore,
{
  let user = state
    .store
    .find_by_id(identity.user_id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound("No user found with that ID".into()))?;
  Ok(Json(user.into()))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /me`
///
/// Credentials are refused outright. Everything else outside the
/// self-service allow-list is dropped silently. Accepted documents are
/// written before their references join the patch, so the record never
/// points at a file that does not exist. If the commit fails, the documents
/// written for it are removed again.
pub async fn update_me<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
  form: ProfileForm,
) -> Result<Json<UserResponse>, ApiError>
where
  S: RecordStore,
{
  let owner = identity.user_id;

  if let Some(field) = contains_forbidden(&form.attributes) {
    tracing::warn!(user_id = %owner, field, "refused credential change on /me");
    return Err(ApiError::BadRequest(
      "This route is not for password updates. Please use /updateMyPassword."
        .into(),
    ));
  }

  // Check the allow-listed fields before any file hits the disk.
  let mut patch =
    UserPatch::try_from(filter_fields(&form.attributes, SELF_SERVICE_FIELDS))
      .map_err(ApiError::Validation)?;
  patch.validate().map_err(ApiError::Validation)?;

  let mut to_store = Vec::new();
  for (slot, file) in form.files {
    match state.uploads.rule(slot) {
      Some(rule) if rule.persist => to_store.push((file, rule.processing)),
      _ => tracing::debug!(%slot, "document storage disabled, dropping upload"),
    }
  }

  let stamp_ms = Utc::now().timestamp_millis();
  let stored = state
    .documents
    .persist_all(owner, stamp_ms, to_store)
    .await?;
  for doc in &stored {
    patch.set_document(doc.slot, doc.filename.clone());
  }

  let committed = state
    .store
    .update_by_id(owner, patch, UpdateOptions { validate: true })
    .await
    .map_err(ApiError::from_store)
    .and_then(|user| {
      user.ok_or_else(|| ApiError::NotFound("No user found with that ID".into()))
    });
  let user = match committed {
    Ok(user) => user,
    Err(err) => {
      state.documents.remove_all(&stored).await;
      return Err(err);
    }
  };

  tracing::info!(user_id = %owner, "profile updated");
  Ok(Json(user.into()))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /me`: flips `active` off. Repeating it is harmless.
pub async fn delete_me<S>(
  State(state): State<ApiState<S>>,
  Caller(identity): Caller,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore,
{
  let updated = state
    .store
    .update_by_id(identity.user_id, UserPatch::deactivate(), UpdateOptions::default())
    .await
    .map_err(ApiError::from_store)?;

  if updated.is_none() {
    tracing::debug!(user_id = %identity.user_id, "deactivation matched no record");
  } else {
    tracing::info!(user_id = %identity.user_id, "account deactivated");
  }
  Ok(StatusCode::NO_CONTENT)
}
