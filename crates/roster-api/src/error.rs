//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is answered with `{"status": ..., "message": ...}` where
//! `status` is `"fail"` for client errors and `"error"` for server errors.

use std::error::Error as StdError;

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use roster_core::ValidationError;
use serde_json::json;
use thiserror::Error;

use crate::{normalize::NormalizeError, upload::UploadError};

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// The record store refused the patch.
  #[error("invalid input: {0}")]
  Validation(ValidationError),

  #[error(transparent)]
  Upload(#[from] UploadError),

  #[error("document processing failed: {0}")]
  Processing(#[from] NormalizeError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn StdError + Send + Sync>),
}

impl ApiError {
  /// Classify a record-store error: a [`ValidationError`] anywhere in its
  /// source chain is the client's fault, anything else is ours.
  pub fn from_store<E>(err: E) -> Self
  where
    E: StdError + Send + Sync + 'static,
  {
    let validation = std::iter::successors(
      Some(&err as &(dyn StdError + 'static)),
      |&e| e.source(),
    )
    .find_map(|e| e.downcast_ref::<ValidationError>())
    .cloned();

    match validation {
      Some(v) => ApiError::Validation(v),
      None => ApiError::Store(Box::new(err)),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::BadRequest(_) | ApiError::Validation(_) => {
        StatusCode::BAD_REQUEST
      }
      ApiError::Upload(e) => e.status(),
      ApiError::Processing(_) | ApiError::Store(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::Unauthorized => "Please log in to get access.".to_string(),
      ApiError::NotFound(m) | ApiError::BadRequest(m) => m.clone(),
      ApiError::Validation(e) => format!("Invalid input data. {e}"),
      ApiError::Upload(e) => e.to_string(),
      ApiError::Processing(e) => e.to_string(),
      ApiError::Store(e) => e.to_string(),
    };

    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }

    let kind = if status.is_client_error() { "fail" } else { "error" };
    (status, Json(json!({ "status": kind, "message": message }))).into_response()
  }
}
