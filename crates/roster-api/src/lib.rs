//! JSON REST API for Roster's self-service account endpoints.
//!
//! Exposes an axum [`Router`] backed by any [`roster_core::store::RecordStore`].
//! Authentication is the caller's responsibility: an upstream layer must
//! insert a [`roster_core::Identity`] into each request's extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v1/users", roster_api::api_router(state))
//! ```

pub mod error;
pub mod identity;
pub mod me;
pub mod normalize;
pub mod upload;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use roster_core::store::RecordStore;

pub use error::ApiError;
pub use identity::Caller;
pub use normalize::DocumentStore;
pub use upload::UploadConfig;

/// Shared state threaded through the API handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub uploads:   Arc<UploadConfig>,
  pub documents: Arc<DocumentStore>,
}

impl<S> ApiState<S> {
  pub fn new(store: Arc<S>, uploads: UploadConfig, documents: DocumentStore) -> Self {
    Self {
      store,
      uploads: Arc::new(uploads),
      documents: Arc::new(documents),
    }
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      uploads:   Arc::clone(&self.uploads),
      documents: Arc::clone(&self.documents),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: RecordStore + 'static,
{
  let body_limit = state.uploads.body_limit();
  Router::new()
    .route(
      "/me",
      get(me::get_me::<S>)
        .patch(me::update_me::<S>)
        .delete(me::delete_me::<S>),
    )
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}
