//! Error types and axum `IntoResponse` implementation.

use std::sync::Arc;

use axum::{
  http::{HeaderValue, header},
  response::{IntoResponse, Response},
};
use roster_api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized { realm: Arc<str> },
  #[error("credential lookup failed: {0}")]
  Store(#[from] roster_store_sqlite::Error),
}

/// Failures reuse the API's JSON envelope; a 401 additionally carries a
/// Basic challenge for `realm`.
impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized { realm } => {
        let mut res = ApiError::Unauthorized.into_response();
        match HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")) {
          Ok(challenge) => {
            res.headers_mut().insert(header::WWW_AUTHENTICATE, challenge);
          }
          Err(_) => tracing::warn!(%realm, "auth realm is not a valid header value"),
        }
        res
      }
      Error::Store(e) => ApiError::Store(Box::new(e)).into_response(),
    }
  }
}
