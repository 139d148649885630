//! Upload slots: the named positions a profile request may attach files to.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::UserId;

/// Canonical edge length, in pixels, of every normalised image.
pub const NORMALIZED_SIZE: u32 = 500;

/// JPEG quality used when re-encoding normalised images.
pub const JPEG_QUALITY: u8 = 90;

/// Message returned when an image-only slot receives something else.
pub const NOT_AN_IMAGE: &str = "Not an image! Please upload only images.";

// ─── Slot ────────────────────────────────────────────────────────────────────

/// A named upload position. At most one file per slot per request.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Slot {
  #[serde(rename = "photo")]
  Photo,
  #[serde(rename = "cv")]
  Cv,
  #[serde(rename = "licensedID")]
  LicensedId,
}

impl Slot {
  pub const ALL: [Slot; 3] = [Slot::Photo, Slot::Cv, Slot::LicensedId];

  /// The multipart field name clients use for this slot.
  pub fn field_name(self) -> &'static str {
    match self {
      Slot::Photo => "photo",
      Slot::Cv => "cv",
      Slot::LicensedId => "licensedID",
    }
  }

  pub fn from_field_name(name: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|slot| slot.field_name() == name)
  }
}

impl fmt::Display for Slot {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.field_name())
  }
}

// ─── Acceptance ──────────────────────────────────────────────────────────────

/// Why a file was refused by a slot before being buffered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotRejection {
  #[error("{}", NOT_AN_IMAGE)]
  NotAnImage {
    slot:         Slot,
    content_type: Option<String>,
  },
}

/// Per-slot acceptance predicate, evaluated against the declared MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptPolicy {
  /// The declared content type must begin with `image`.
  ImagesOnly,
  /// Any declared content type, including none.
  Any,
}

impl AcceptPolicy {
  pub fn check(
    self,
    slot: Slot,
    content_type: Option<&str>,
  ) -> Result<(), SlotRejection> {
    match self {
      AcceptPolicy::Any => Ok(()),
      AcceptPolicy::ImagesOnly => match content_type {
        Some(ct) if ct.starts_with("image") => Ok(()),
        other => Err(SlotRejection::NotAnImage {
          slot,
          content_type: other.map(str::to_owned),
        }),
      },
    }
  }
}

/// What the normaliser does with an accepted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Processing {
  /// Decode, resize to [`NORMALIZED_SIZE`] square and re-encode as JPEG.
  NormalizeImage,
  /// Store the bytes unmodified.
  Passthrough,
}

// ─── Document references ─────────────────────────────────────────────────────

/// Build the stored filename `user-<id>-<stamp_ms>-<slot>.<extension>`.
pub fn document_filename(
  owner: UserId,
  stamp_ms: i64,
  slot: Slot,
  extension: &str,
) -> String {
  format!("user-{owner}-{stamp_ms}-{slot}.{extension}")
}

/// File extension for a passthrough document, derived from its content type.
pub fn passthrough_extension(content_type: Option<&str>) -> &'static str {
  let essence = content_type
    .and_then(|ct| ct.split(';').next())
    .map(str::trim)
    .unwrap_or_default();
  match essence {
    "application/pdf" => "pdf",
    "image/png" => "png",
    "image/jpeg" | "image/jpg" => "jpeg",
    "application/msword" => "doc",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
      "docx"
    }
    "text/plain" => "txt",
    _ => "bin",
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn field_names_round_trip() {
    for slot in Slot::ALL {
      assert_eq!(Slot::from_field_name(slot.field_name()), Some(slot));
    }
    assert_eq!(Slot::from_field_name("avatar"), None);
    assert_eq!(Slot::from_field_name("licensedId"), None);
  }

  #[test]
  fn images_only_accepts_any_image_subtype() {
    let policy = AcceptPolicy::ImagesOnly;
    assert!(policy.check(Slot::Photo, Some("image/png")).is_ok());
    assert!(policy.check(Slot::Photo, Some("image/jpeg")).is_ok());
    assert!(policy.check(Slot::Photo, Some("image/svg+xml")).is_ok());
  }

  #[test]
  fn images_only_rejects_other_types_and_missing_type() {
    let policy = AcceptPolicy::ImagesOnly;
    let err = policy.check(Slot::Photo, Some("text/plain")).unwrap_err();
    assert_eq!(err.to_string(), NOT_AN_IMAGE);
    assert!(policy.check(Slot::Photo, None).is_err());
    assert!(policy.check(Slot::Photo, Some("application/pdf")).is_err());
  }

  #[test]
  fn any_accepts_everything() {
    assert!(AcceptPolicy::Any.check(Slot::Cv, Some("application/pdf")).is_ok());
    assert!(AcceptPolicy::Any.check(Slot::Cv, None).is_ok());
  }

  #[test]
  fn filename_follows_pattern() {
    assert_eq!(
      document_filename(UserId(42), 1_700_000_000_123, Slot::Photo, "jpeg"),
      "user-42-1700000000123-photo.jpeg"
    );
    assert_eq!(
      document_filename(UserId(7), 5, Slot::LicensedId, "jpeg"),
      "user-7-5-licensedID.jpeg"
    );
  }

  #[test]
  fn passthrough_extension_ignores_parameters() {
    assert_eq!(passthrough_extension(Some("application/pdf")), "pdf");
    assert_eq!(passthrough_extension(Some("text/plain; charset=utf-8")), "txt");
    assert_eq!(passthrough_extension(Some("application/x-unknown")), "bin");
    assert_eq!(passthrough_extension(None), "bin");
  }
}
