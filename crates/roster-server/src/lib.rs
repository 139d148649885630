//! HTTP server wiring for Roster.
//!
//! Mounts the self-service API behind Basic auth at `/api/v1/users` and
//! serves stored documents from the public directory under `/public`.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware};
use roster_api::{ApiState, DocumentStore, UploadConfig, upload::DEFAULT_MAX_FILE_BYTES};
use roster_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                        String,
  #[serde(default = "default_port")]
  pub port:                        u16,
  #[serde(default = "default_store_path")]
  pub store_path:                  PathBuf,
  /// Directory stored documents are written to and served from.
  #[serde(default = "default_public_dir")]
  pub public_dir:                  PathBuf,
  #[serde(default = "default_max_file_bytes")]
  pub max_file_bytes:              usize,
  /// Store and reference `cv` and `licensedID` uploads. Off by default:
  /// those slots are validated and then dropped.
  #[serde(default)]
  pub persist_secondary_documents: bool,
  #[serde(default = "default_auth_realm")]
  pub auth_realm:                  String,
}

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 3000 }
fn default_store_path() -> PathBuf { PathBuf::from("roster.db") }
fn default_public_dir() -> PathBuf { PathBuf::from("public") }
fn default_max_file_bytes() -> usize { DEFAULT_MAX_FILE_BYTES }
fn default_auth_realm() -> String { "roster".to_string() }

impl ServerConfig {
  pub fn upload_config(&self) -> UploadConfig {
    UploadConfig::profile(self.max_file_bytes, self.persist_secondary_documents)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// State for the auth layer.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<SqliteStore>,
  pub realm: Arc<str>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router(store: Arc<SqliteStore>, config: &ServerConfig) -> Router {
  let auth_state = AppState {
    store: Arc::clone(&store),
    realm: Arc::from(config.auth_realm.as_str()),
  };
  let api_state = ApiState::new(
    store,
    config.upload_config(),
    DocumentStore::new(&config.public_dir),
  );

  let api = roster_api::api_router(api_state).route_layer(
    middleware::from_fn_with_state(auth_state, auth::require_identity),
  );

  Router::new()
    .nest("/api/v1/users", api)
    .nest_service("/public", ServeDir::new(&config.public_dir))
    .layer(TraceLayer::new_for_http())
}

// ─── Integration tests ────────────────────────────────────────────────────────
