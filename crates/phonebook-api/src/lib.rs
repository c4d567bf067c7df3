//! JSON HTTP API for the phonebook.
//!
//! Exposes an axum [`Router`] backed by any [`ContactStore`], with a
//! single-slot [`cache::PageCache`] in front of the listing endpoint.

pub mod cache;
pub mod contacts;
pub mod error;
pub mod listing;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod tests;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{delete, get, post, put},
};
use phonebook_core::store::ContactStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

use cache::PageCache;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PHONEBOOK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".into(),
      port:       8080,
      store_path: PathBuf::from("phonebook.db"),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ContactStore> {
  pub store: Arc<S>,
  pub cache: Arc<PageCache>,
}

impl<S: ContactStore> AppState<S> {
  /// Wrap `store` with an empty cache.
  pub fn new(store: S) -> Self {
    Self { store: Arc::new(store), cache: Arc::new(PageCache::new()) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router. Every request is traced.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ContactStore + Clone + 'static,
{
  Router::new()
    .route("/addContact",          put(contacts::add_one::<S>))
    .route("/addContacts",         put(contacts::add_many::<S>))
    .route("/getContacts",         get(contacts::list::<S>))
    .route("/updateContact/{id}",  post(contacts::update_one::<S>))
    .route("/deleteContact/{id}",  delete(contacts::delete_one::<S>))
    .route("/deleteContacts",      delete(contacts::delete_many::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
