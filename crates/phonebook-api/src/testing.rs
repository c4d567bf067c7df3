//! Test doubles shared by the cache, listing and router tests.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, Ordering},
};

use phonebook_core::{
  contact::{Contact, ContactPatch, NewContact},
  query::{FilteredQuery, QuerySpec},
  store::ContactStore,
};
use phonebook_store_sqlite::{Error, SqliteStore};

/// An in-memory [`SqliteStore`] that records every `search` call as
/// `(page, fetch_expanded)` and can be told to fail them.
#[derive(Clone)]
pub struct CountingStore {
  inner:    SqliteStore,
  searches: Arc<Mutex<Vec<(u32, bool)>>>,
  failing:  Arc<AtomicBool>,
}

impl CountingStore {
  pub async fn new() -> Self {
    Self {
      inner:    SqliteStore::open_in_memory().await.unwrap(),
      searches: Arc::default(),
      failing:  Arc::default(),
    }
  }

  pub fn searches(&self) -> Vec<(u32, bool)> { self.searches.lock().unwrap().clone() }

  pub fn reset_searches(&self) { self.searches.lock().unwrap().clear(); }

  pub fn fail_searches(&self, fail: bool) { self.failing.store(fail, Ordering::SeqCst); }
}

impl ContactStore for CountingStore {
  type Error = Error;

  async fn add_contact(&self, input: NewContact) -> Result<Contact, Error> {
    self.inner.add_contact(input).await
  }

  async fn update_contact(&self, id: i64, patch: ContactPatch) -> Result<Contact, Error> {
    self.inner.update_contact(id, patch).await
  }

  async fn delete_contact(&self, id: i64) -> Result<(), Error> {
    self.inner.delete_contact(id).await
  }

  async fn get_contact(&self, id: i64) -> Result<Option<Contact>, Error> {
    self.inner.get_contact(id).await
  }

  async fn filter(&self, spec: QuerySpec) -> Result<FilteredQuery, Error> {
    self.inner.filter(spec).await
  }

  async fn search(
    &self,
    spec: &QuerySpec,
    page: u32,
    fetch_expanded: bool,
  ) -> Result<Vec<Contact>, Error> {
    self.searches.lock().unwrap().push((page, fetch_expanded));
    if self.failing.load(Ordering::SeqCst) {
      let cause = phonebook_core::Error::Store("injected search failure".into());
      return Err(Error::Core(cause));
    }
    self.inner.search(spec, page, fetch_expanded).await
  }

  async fn count(&self) -> Result<u64, Error> { self.inner.count().await }
}
