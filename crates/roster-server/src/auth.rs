//! HTTP Basic-auth middleware.
//!
//! The username is the account email. Credentials are checked against the
//! argon2 PHC string stored with the account; deactivated accounts never
//! authenticate. On success an [`Identity`] is inserted into the request
//! extensions for the API's `Caller` extractor.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
  extract::{Request, State},
  http::{HeaderMap, header},
  middleware::Next,
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use roster_core::{
  Identity,
  store::{RecordStore, UserFilter},
};

use crate::{AppState, error::Error};

/// Resolve the caller behind the `Authorization` header.
pub async fn authenticate(
  headers: &HeaderMap,
  state: &AppState,
) -> Result<Identity, Error> {
  let unauthorized = || Error::Unauthorized {
    realm: state.realm.clone(),
  };

  let header_val = headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or_else(unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| unauthorized())?;
  let creds = std::str::from_utf8(&decoded).map_err(|_| unauthorized())?;

  let (email, password) = creds.split_once(':').ok_or_else(unauthorized)?;

  let filter = UserFilter {
    email: Some(email.to_owned()),
    active: Some(true),
    limit: Some(1),
    ..UserFilter::default()
  };
  let Some(user) = state.store.query(&filter).await?.into_iter().next() else {
    tracing::debug!(%email, "no active account for credentials");
    return Err(unauthorized());
  };

  let stored = state
    .store
    .password_hash(user.id)
    .await?
    .ok_or_else(unauthorized)?;
  let parsed_hash = PasswordHash::new(&stored).map_err(|_| unauthorized())?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| unauthorized())?;

  Ok(Identity { user_id: user.id })
}

/// Middleware: reject unauthenticated requests, tag the rest with their
/// [`Identity`].
pub async fn require_identity(
  State(state): State<AppState>,
  mut req: Request,
  next: Next,
) -> Result<Response, Error> {
  let identity = authenticate(req.headers(), &state).await?;
  req.extensions_mut().insert(identity);
  Ok(next.run(req).await)
}
