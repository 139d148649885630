//! Field allow-listing for client-supplied attribute bags.
//!
//! Clients routinely send more keys than an operation may touch (form
//! frameworks, stale UI, curiosity). Extra keys are dropped silently; only the
//! explicitly forbidden credential keys are an error, and that decision is
//! made by the caller via [`contains_forbidden`].

use crate::AttributeBag;

/// Fields a user may change on their own profile.
pub const SELF_SERVICE_FIELDS: &[&str] = &["name", "email"];

/// Keys that must never reach a self-service profile edit. Credentials have
/// their own change flow.
pub const FORBIDDEN_FIELDS: &[&str] = &["password", "passwordConfirm"];

/// Return a new bag holding exactly the keys of `bag` that appear in
/// `allowed`, with their values untouched and in their original order.
pub fn filter_fields(bag: &AttributeBag, allowed: &[&str]) -> AttributeBag {
  bag
    .iter()
    .filter(|(key, _)| allowed.contains(&key.as_str()))
    .map(|(key, value)| (key.clone(), value.clone()))
    .collect()
}

/// Return the first key of [`FORBIDDEN_FIELDS`] present in `bag`, if any.
///
/// Presence is what counts: an empty or `null` password is still a password
/// change attempt.
pub fn contains_forbidden(bag: &AttributeBag) -> Option<&'static str> {
  FORBIDDEN_FIELDS
    .iter()
    .copied()
    .find(|key| bag.contains_key(*key))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn bag(value: serde_json::Value) -> AttributeBag {
    value.as_object().cloned().unwrap()
  }

  #[test]
  fn keeps_only_the_intersection() {
    let raw = bag(json!({
      "name":  "Ada",
      "role":  "admin",
      "email": "ada@example.com",
      "active": false,
    }));

    let filtered = filter_fields(&raw, SELF_SERVICE_FIELDS);
    let keys: Vec<&str> = filtered.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["name", "email"]);
    assert_eq!(filtered["name"], json!("Ada"));
    assert_eq!(filtered["email"], json!("ada@example.com"));
  }

  #[test]
  fn values_pass_through_unmodified() {
    let raw = bag(json!({ "name": { "nested": [1, 2, 3] }, "email": null }));
    let filtered = filter_fields(&raw, SELF_SERVICE_FIELDS);
    assert_eq!(filtered, raw);
  }

  #[test]
  fn filtering_is_idempotent() {
    let raw = bag(json!({ "email": "x@y.io", "photo": "evil.jpeg", "name": "X" }));
    let once = filter_fields(&raw, SELF_SERVICE_FIELDS);
    let twice = filter_fields(&once, SELF_SERVICE_FIELDS);
    assert_eq!(once, twice);
  }

  #[test]
  fn empty_allow_list_yields_empty_bag() {
    let raw = bag(json!({ "name": "Ada" }));
    assert!(filter_fields(&raw, &[]).is_empty());
  }

  #[test]
  fn allow_list_keys_missing_from_bag_are_not_invented() {
    let raw = bag(json!({ "name": "Ada" }));
    let filtered = filter_fields(&raw, SELF_SERVICE_FIELDS);
    assert_eq!(filtered.len(), 1);
    assert!(!filtered.contains_key("email"));
  }

  #[test]
  fn detects_password_keys_even_when_empty() {
    assert_eq!(
      contains_forbidden(&bag(json!({ "name": "Ada", "password": "" }))),
      Some("password")
    );
    assert_eq!(
      contains_forbidden(&bag(json!({ "passwordConfirm": null }))),
      Some("passwordConfirm")
    );
    assert_eq!(contains_forbidden(&bag(json!({ "name": "Ada" }))), None);
  }
}
