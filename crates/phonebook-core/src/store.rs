//! The `ContactStore` trait.
//!
//! Implemented by storage backends (e.g. `phonebook-store-sqlite`). The API
//! layer and the pagination cache depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use crate::{
  contact::{Contact, ContactPatch, NewContact},
  query::{FilteredQuery, QuerySpec},
};

/// Abstraction over a phonebook storage backend.
///
/// Backend errors must convert into [`crate::Error`] so callers can tell
/// validation, duplicate and not-found failures apart from everything else.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`), including from
/// detached background tasks.
pub trait ContactStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Validate and insert a new contact. Fails with a duplicate error if a
  /// contact with the same (first name, last name, phone) already exists.
  fn add_contact(
    &self,
    input: NewContact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Merge `patch` onto contact `id`. Fails with not-found if `id` is absent
  /// and with a duplicate error if a *different* contact already holds the
  /// merged identity triple. Refreshes `last_modified`.
  fn update_contact(
    &self,
    id: i64,
    patch: ContactPatch,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  /// Delete contact `id`. Fails with not-found if it does not exist.
  fn delete_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a contact by id. Returns `None` if not found.
  fn get_contact(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// Count the rows `spec` matches and hand the spec back for paging.
  fn filter(
    &self,
    spec: QuerySpec,
  ) -> impl Future<Output = Result<FilteredQuery, Self::Error>> + Send + '_;

  /// Execute `spec` for one 1-based `page`. With `fetch_expanded` the store
  /// reads up to two pages' worth of rows starting at `page`.
  fn search<'a>(
    &'a self,
    spec: &'a QuerySpec,
    page: u32,
    fetch_expanded: bool,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + 'a;

  /// Total number of stored contacts.
  fn count(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
