//! User records, patches, and the caller identity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AttributeBag, error::ValidationError, slot::Slot};

/// Longest display name accepted by [`UserPatch::validate`].
pub const MAX_NAME_LEN: usize = 100;

// ─── Identity ────────────────────────────────────────────────────────────────

/// Storage identifier of a user record.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The authenticated caller of a request, as established by the auth layer.
///
/// Handlers key every read and write on this value and never on an id found
/// in the request body or path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
  pub user_id: UserId,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// A user record as held by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:          UserId,
  pub name:        String,
  pub email:       String,
  pub photo:       Option<String>,
  pub cv:          Option<String>,
  #[serde(rename = "licensedID")]
  pub licensed_id: Option<String>,
  /// Soft-delete flag. Never exposed to clients.
  #[serde(skip_serializing, default = "default_active")]
  pub active:      bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

fn default_active() -> bool { true }

// ─── Patch ───────────────────────────────────────────────────────────────────

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
  pub name:        Option<String>,
  pub email:       Option<String>,
  pub photo:       Option<String>,
  pub cv:          Option<String>,
  pub licensed_id: Option<String>,
  pub active:      Option<bool>,
}

impl UserPatch {
  /// A patch that only flips the soft-delete flag off.
  pub fn deactivate() -> Self {
    Self {
      active: Some(false),
      ..Self::default()
    }
  }

  pub fn is_empty(&self) -> bool { self == &Self::default() }

  /// Point the record field belonging to `slot` at a stored document.
  pub fn set_document(&mut self, slot: Slot, filename: String) {
    let field = match slot {
      Slot::Photo => &mut self.photo,
      Slot::Cv => &mut self.cv,
      Slot::LicensedId => &mut self.licensed_id,
    };
    *field = Some(filename);
  }

  /// Check field contents and canonicalise them in place: the name is
  /// trimmed and the email trimmed and lower-cased.
  pub fn validate(&mut self) -> Result<(), ValidationError> {
    if let Some(name) = self.name.as_mut() {
      let trimmed = name.trim();
      if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
      }
      if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
      }
      *name = trimmed.to_owned();
    }

    if let Some(email) = self.email.as_mut() {
      let canonical = email.trim().to_lowercase();
      if !is_valid_email(&canonical) {
        return Err(ValidationError::InvalidEmail(email.clone()));
      }
      *email = canonical;
    }

    Ok(())
  }
}

impl TryFrom<AttributeBag> for UserPatch {
  type Error = ValidationError;

  fn try_from(bag: AttributeBag) -> Result<Self, Self::Error> {
    let mut patch = UserPatch::default();
    for (key, value) in bag {
      match key.as_str() {
        "name" => patch.name = Some(expect_string(&key, value)?),
        "email" => patch.email = Some(expect_string(&key, value)?),
        "photo" => patch.photo = Some(expect_string(&key, value)?),
        "cv" => patch.cv = Some(expect_string(&key, value)?),
        "licensedID" => patch.licensed_id = Some(expect_string(&key, value)?),
        "active" => match value {
          Value::Bool(b) => patch.active = Some(b),
          _ => {
            return Err(ValidationError::InvalidType {
              field:    key,
              expected: "a boolean",
            });
          }
        },
        _ => return Err(ValidationError::UnknownField(key)),
      }
    }
    Ok(patch)
  }
}

fn expect_string(key: &str, value: Value) -> Result<String, ValidationError> {
  match value {
    Value::String(s) => Ok(s),
    _ => Err(ValidationError::InvalidType {
      field:    key.to_owned(),
      expected: "a string",
    }),
  }
}

/// A deliberately small structural check: one `@`, a non-empty local part,
/// a dotted domain whose labels are non-empty, and no whitespace.
fn is_valid_email(email: &str) -> bool {
  if email.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = email.split_once('@') else {
    return false;
  };
  if local.is_empty() || domain.contains('@') {
    return false;
  }
  let labels: Vec<&str> = domain.split('.').collect();
  labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn bag(value: Value) -> AttributeBag { value.as_object().cloned().unwrap() }

  #[test]
  fn patch_from_bag_maps_known_fields() {
    let patch = UserPatch::try_from(bag(json!({
      "name": "Ada",
      "email": "ada@example.com",
      "photo": "user-1-2-photo.jpeg",
    })))
    .unwrap();
    assert_eq!(patch.name.as_deref(), Some("Ada"));
    assert_eq!(patch.email.as_deref(), Some("ada@example.com"));
    assert_eq!(patch.photo.as_deref(), Some("user-1-2-photo.jpeg"));
    assert_eq!(patch.active, None);
  }

  #[test]
  fn patch_from_bag_rejects_wrong_types() {
    let err = UserPatch::try_from(bag(json!({ "name": 12 }))).unwrap_err();
    assert_eq!(err, ValidationError::InvalidType {
      field:    "name".into(),
      expected: "a string",
    });
  }

  #[test]
  fn patch_from_bag_rejects_unknown_fields() {
    let err = UserPatch::try_from(bag(json!({ "role": "admin" }))).unwrap_err();
    assert_eq!(err, ValidationError::UnknownField("role".into()));
  }

  #[test]
  fn empty_bag_is_empty_patch() {
    assert!(UserPatch::try_from(AttributeBag::new()).unwrap().is_empty());
    assert!(!UserPatch::deactivate().is_empty());
  }

  #[test]
  fn set_document_targets_the_slot_field() {
    let mut patch = UserPatch::default();
    patch.set_document(Slot::LicensedId, "user-1-2-licensedID.jpeg".into());
    assert_eq!(patch.licensed_id.as_deref(), Some("user-1-2-licensedID.jpeg"));
    assert_eq!(patch.photo, None);
    assert_eq!(patch.cv, None);
  }

  #[test]
  fn validate_canonicalises_email_and_name() {
    let mut patch = UserPatch {
      name: Some("  Ada Lovelace ".into()),
      email: Some(" Ada@Example.COM ".into()),
      ..UserPatch::default()
    };
    patch.validate().unwrap();
    assert_eq!(patch.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(patch.email.as_deref(), Some("ada@example.com"));
  }

  #[test]
  fn validate_rejects_malformed_email() {
    for bad in ["", "ada", "ada@", "@example.com", "ada@example", "a b@c.d", "a@b..c"] {
      let mut patch = UserPatch {
        email: Some(bad.into()),
        ..UserPatch::default()
      };
      assert!(
        matches!(patch.validate(), Err(ValidationError::InvalidEmail(_))),
        "accepted {bad:?}"
      );
    }
  }

  #[test]
  fn validate_rejects_blank_and_long_names() {
    let mut blank = UserPatch {
      name: Some("   ".into()),
      ..UserPatch::default()
    };
    assert_eq!(blank.validate(), Err(ValidationError::EmptyName));

    let mut long = UserPatch {
      name: Some("x".repeat(MAX_NAME_LEN + 1)),
      ..UserPatch::default()
    };
    assert_eq!(
      long.validate(),
      Err(ValidationError::NameTooLong { max: MAX_NAME_LEN })
    );
  }

  #[test]
  fn user_serialisation_hides_active_flag() {
    let now = Utc::now();
    let user = User {
      id: UserId(42),
      name: "Ada".into(),
      email: "ada@example.com".into(),
      photo: Some("user-42-1-photo.jpeg".into()),
      cv: None,
      licensed_id: None,
      active: true,
      created_at: now,
      updated_at: now,
    };
    let value = serde_json::to_value(&user).unwrap();
    assert_eq!(value["id"], json!(42));
    assert_eq!(value["photo"], json!("user-42-1-photo.jpeg"));
    assert!(value.get("active").is_none());
    assert!(value.get("licensedID").is_some());
  }
}
