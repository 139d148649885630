//! The [`Caller`] extractor.
//!
//! Authentication happens upstream: whatever layer verifies credentials
//! inserts an [`Identity`] into the request extensions. Handlers only ever
//! trust that value, never an id from the body, query, or path.

use axum::{extract::FromRequestParts, http::request::Parts};
use roster_core::Identity;

use crate::error::ApiError;

/// The authenticated caller of the current request.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Identity);

impl<S> FromRequestParts<S> for Caller
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Identity>()
      .copied()
      .map(Caller)
      .ok_or(ApiError::Unauthorized)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::Request;
  use roster_core::UserId;

  use super::*;

  #[tokio::test]
  async fn reads_identity_from_extensions() {
    let mut req = Request::builder().body(()).unwrap();
    req.extensions_mut().insert(Identity { user_id: UserId(9) });
    let (mut parts, _) = req.into_parts();
    let Caller(identity) = Caller::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(identity.user_id, UserId(9));
  }

  #[tokio::test]
  async fn missing_identity_is_unauthorized() {
    let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
    let err = Caller::from_request_parts(&mut parts, &()).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
  }
}
