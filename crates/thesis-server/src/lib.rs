//! Wiring for the thesis workflow HTTP server.
//!
//! Configuration is layered by the binary: an optional TOML file under
//! `THESIS_*` environment variables, e.g.
//!
//! ```toml
//! host       = "0.0.0.0"
//! port       = 8080
//! store_path = "~/.local/share/thesis/thesis.db"
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::Router;
use serde::Deserialize;
use thesis_core::LifecycleEngine;
use thesis_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("thesis.db") }

// ─── Application ─────────────────────────────────────────────────────────────

/// Build the HTTP application around `store`, which also receives the audit
/// log.
pub fn app(store: SqliteStore) -> Router {
  let store = Arc::new(store);
  let engine = Arc::new(LifecycleEngine::new(Arc::clone(&store), store));
  thesis_api::api_router(engine).layer(TraceLayer::new_for_http())
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
