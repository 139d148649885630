//! Upload receiver: turns a profile request body into an attribute bag plus
//! at most one in-memory file per upload slot.
//!
//! Multipart bodies are read part by part. Text parts become string entries
//! in the bag. File parts (parts carrying a filename) must name a configured
//! slot, pass that slot's [`AcceptPolicy`] *before* any of their bytes are
//! read, and stay under the per-file size limit. The first offending part
//! fails the whole request.
//!
//! Nothing is written to disk here; buffers live as long as the request.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{FromRequest, Multipart, Request, multipart::MultipartError},
  http::{HeaderMap, StatusCode, header},
};
use bytes::{Bytes, BytesMut};
use roster_core::{
  AttributeBag,
  slot::{AcceptPolicy, Processing, Slot, SlotRejection},
  store::RecordStore,
};
use serde_json::Value;
use thiserror::Error;

use crate::{ApiState, error::ApiError};

/// Default per-file size cap: 10 MiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Allowance for the text parts and multipart framing of a request.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

// ─── Configuration ───────────────────────────────────────────────────────────

/// How a single slot treats incoming files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRule {
  pub slot:       Slot,
  pub accept:     AcceptPolicy,
  pub processing: Processing,
  /// Whether accepted files are handed to the normaliser and referenced on
  /// the user record. When `false` the file is validated and then dropped.
  pub persist:    bool,
}

/// Upload settings for the profile endpoint. Each listed slot accepts at
/// most one file; unlisted field names are refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
  pub rules:          Vec<SlotRule>,
  pub max_file_bytes: usize,
}

impl UploadConfig {
  /// The profile endpoint's slots: `photo` (images, normalised, stored),
  /// `licensedID` (images, normalised) and `cv` (any type, stored as-is).
  ///
  /// Only the photo is referenced on the record unless
  /// `persist_secondary_documents` is set.
  pub fn profile(max_file_bytes: usize, persist_secondary_documents: bool) -> Self {
    Self {
      rules: vec![
        SlotRule {
          slot:       Slot::Photo,
          accept:     AcceptPolicy::ImagesOnly,
          processing: Processing::NormalizeImage,
          persist:    true,
        },
        SlotRule {
          slot:       Slot::Cv,
          accept:     AcceptPolicy::Any,
          processing: Processing::Passthrough,
          persist:    persist_secondary_documents,
        },
        SlotRule {
          slot:       Slot::LicensedId,
          accept:     AcceptPolicy::ImagesOnly,
          processing: Processing::NormalizeImage,
          persist:    persist_secondary_documents,
        },
      ],
      max_file_bytes,
    }
  }

  pub fn rule(&self, slot: Slot) -> Option<&SlotRule> {
    self.rules.iter().find(|r| r.slot == slot)
  }

  /// Largest request body this configuration can legitimately produce.
  pub fn body_limit(&self) -> usize {
    self
      .max_file_bytes
      .saturating_mul(self.rules.len())
      .saturating_add(FORM_OVERHEAD_BYTES)
  }
}

impl Default for UploadConfig {
  fn default() -> Self { Self::profile(DEFAULT_MAX_FILE_BYTES, false) }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// A file accepted into a slot, held fully in memory.
#[derive(Debug, Clone)]
pub struct ReceivedFile {
  pub slot:         Slot,
  pub content_type: Option<String>,
  pub bytes:        Bytes,
}

/// A decoded profile request: the raw attribute bag and the accepted files.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
  pub attributes: AttributeBag,
  pub files:      BTreeMap<Slot, ReceivedFile>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum UploadError {
  #[error(transparent)]
  Rejected(#[from] SlotRejection),

  #[error("Unexpected field: `{0}` does not accept files.")]
  UnexpectedField(String),

  #[error("Unexpected field: only one file may be uploaded as `{0}`.")]
  TooManyFiles(Slot),

  #[error("File too large: `{slot}` exceeds {limit} bytes.")]
  TooLarge { slot: Slot, limit: usize },

  #[error("Malformed multipart body: {}", .0.body_text())]
  Multipart(#[from] MultipartError),
}

impl UploadError {
  pub fn status(&self) -> StatusCode {
    match self {
      UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
      UploadError::Multipart(e) => e.status(),
      _ => StatusCode::BAD_REQUEST,
    }
  }
}

// ─── Receiver ────────────────────────────────────────────────────────────────

/// Drain `multipart` into a [`ProfileForm`] under the rules of `config`.
pub async fn receive(
  mut multipart: Multipart,
  config: &UploadConfig,
) -> Result<ProfileForm, UploadError> {
  let mut form = ProfileForm::default();

  while let Some(mut field) = multipart.next_field().await? {
    let name = field.name().unwrap_or_default().to_owned();

    let Some(file_name) = field.file_name().map(str::to_owned) else {
      let text = field.text().await?;
      form.attributes.insert(name, Value::String(text));
      continue;
    };
    // Browsers send an empty filename for a file input left blank.
    if file_name.is_empty() {
      continue;
    }

    let rule = Slot::from_field_name(&name)
      .and_then(|slot| config.rule(slot))
      .ok_or_else(|| UploadError::UnexpectedField(name.clone()))?;
    let slot = rule.slot;

    if form.files.contains_key(&slot) {
      return Err(UploadError::TooManyFiles(slot));
    }

    let content_type = field.content_type().map(str::to_owned);
    if let Err(rejection) = rule.accept.check(slot, content_type.as_deref()) {
      tracing::warn!(%slot, ?content_type, "rejected upload");
      return Err(rejection.into());
    }

    let mut buffer = BytesMut::new();
    while let Some(chunk) = field.chunk().await? {
      if buffer.len() + chunk.len() > config.max_file_bytes {
        return Err(UploadError::TooLarge {
          slot,
          limit: config.max_file_bytes,
        });
      }
      buffer.extend_from_slice(&chunk);
    }

    tracing::debug!(%slot, bytes = buffer.len(), "received upload");
    form.files.insert(slot, ReceivedFile {
      slot,
      content_type,
      bytes: buffer.freeze(),
    });
  }

  Ok(form)
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// `multipart/form-data` bodies go through [`receive`]; anything else is read
/// as a JSON object with no files.
impl<S> FromRequest<ApiState<S>> for ProfileForm
where
  S: RecordStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request(
    req: Request,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    if is_form_data(req.headers()) {
      let multipart = Multipart::from_request(req, state)
        .await
        .map_err(|r| ApiError::BadRequest(r.body_text()))?;
      Ok(receive(multipart, &state.uploads).await?)
    } else {
      let Json(attributes) = Json::<AttributeBag>::from_request(req, state)
        .await
        .map_err(|r| ApiError::BadRequest(r.body_text()))?;
      Ok(ProfileForm {
        attributes,
        files: BTreeMap::new(),
      })
    }
  }
}

/// Whether the request declares a `multipart/form-data` body. Media types
/// compare case-insensitively and parameters are ignored.
fn is_form_data(headers: &HeaderMap) -> bool {
  headers
    .get(header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .and_then(|ct| ct.split(';').next())
    .is_some_and(|essence| essence.trim().eq_ignore_ascii_case("multipart/form-data"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn headers(content_type: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    headers
  }

  #[test]
  fn form_data_detection_ignores_case_and_parameters() {
    assert!(is_form_data(&headers("multipart/form-data; boundary=x")));
    assert!(is_form_data(&headers("Multipart/Form-Data; boundary=x")));
    assert!(is_form_data(&headers("MULTIPART/FORM-DATA")));
  }

  #[test]
  fn other_media_types_are_not_form_data() {
    assert!(!is_form_data(&headers("application/json")));
    assert!(!is_form_data(&headers("multipart/mixed; boundary=x")));
    assert!(!is_form_data(&headers("multipart/form-data-ish")));
    assert!(!is_form_data(&HeaderMap::new()));
  }
}
