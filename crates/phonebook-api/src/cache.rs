//! Single-slot pagination cache.
//!
//! The slot remembers one query (by its [`QueryKey`]) and the rows of the
//! page a client is expected to ask for next. Only one page is ever held:
//! a hit hands the rows out and schedules a background fetch of the page
//! after it, a miss is served from the store and seeds the slot with the
//! surplus rows of an expanded fetch.
//!
//! # Coherence
//!
//! Writes never touch the slot; they bump an atomic write epoch through
//! [`PageCache::invalidate`]. Every slot records the epoch that was current
//! *before* its rows were read, and a slot whose epoch is behind is dirty.
//! The mutex is never held across a store round trip, so a slow read cannot
//! stall other requests, and a new slot is always published whole.

use std::{
  mem,
  sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
  },
};

use phonebook_core::{
  contact::Contact,
  query::{QueryKey, QuerySpec},
  store::ContactStore,
};
use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, error};

// ─── Slot ────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Slot {
  /// `None` while the cache is empty.
  spec:        Option<QuerySpec>,
  key:         QueryKey,
  /// The page `rows` belong to.
  page:        u32,
  rows:        Vec<Contact>,
  total_pages: u32,
  total_count: u64,
  /// Set when a prefetch failed or found nothing.
  stale:       bool,
  /// Write epoch observed before `rows` were read.
  epoch:       u64,
  /// Bumped whenever the slot is replaced or handed out.
  generation:  u64,
  prefetch:    Option<JoinHandle<()>>,
}

impl Slot {
  /// Swap in `next`, aborting whatever prefetch was feeding the old slot.
  fn replace(&mut self, mut next: Slot) {
    if let Some(task) = self.prefetch.take() {
      task.abort();
    }
    next.generation = self.generation + 1;
    *self = next;
  }
}

// ─── Public types ────────────────────────────────────────────────────────────

/// Outcome of [`PageCache::lookup`].
#[derive(Debug)]
pub enum Lookup {
  Hit(Hit),
  /// Nothing usable is cached. Carries the write epoch to hand back to
  /// [`PageCache::fill`] once the page has been read.
  Miss { epoch: u64 },
}

/// Rows served from the cache, plus what is needed to refill it.
#[derive(Debug)]
pub struct Hit {
  pub rows:   Vec<Contact>,
  pub spec:   QuerySpec,
  pub ticket: PrefetchTicket,
}

/// Identifies the slot a prefetch was scheduled for. A prefetch whose ticket
/// no longer matches the slot generation is discarded.
#[derive(Debug, Clone, Copy)]
pub struct PrefetchTicket {
  pub page:       u32,
  pub generation: u64,
}

/// The result of a synchronous read, ready to seed the slot.
#[derive(Debug)]
pub struct Fill {
  pub spec:        QuerySpec,
  pub key:         QueryKey,
  /// Page that `rows` belong to, i.e. the page after the one served.
  pub page:        u32,
  pub rows:        Vec<Contact>,
  pub total_pages: u32,
  pub total_count: u64,
  /// Epoch returned by the [`Lookup::Miss`] that preceded the read.
  pub epoch:       u64,
}

/// Point-in-time view of the slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
  pub key:         Option<String>,
  pub page:        u32,
  pub cached_rows: usize,
  pub total_pages: u32,
  pub total_count: u64,
  pub dirty:       bool,
}

// ─── PageCache ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct PageCache {
  slot:  Mutex<Slot>,
  epoch: AtomicU64,
}

impl PageCache {
  pub fn new() -> Self { Self::default() }

  /// Mark whatever is cached as dirty. Called after every successful write.
  pub fn invalidate(&self) { self.epoch.fetch_add(1, Ordering::SeqCst); }

  fn is_dirty(&self, slot: &Slot) -> bool {
    slot.stale || slot.epoch != self.epoch.load(Ordering::SeqCst)
  }

  /// Decide whether page `page` of the query keyed `key` can be served from
  /// the slot.
  ///
  /// `total_count` is the row count the caller just observed; a slot
  /// recorded under a different count is treated as dirty. On a hit the
  /// rows are moved out of the slot. On a miss for a different key the old
  /// slot is discarded straight away.
  pub async fn lookup(&self, key: &QueryKey, page: u32, total_count: u64) -> Lookup {
    let mut slot = self.slot.lock().await;
    let epoch = self.epoch.load(Ordering::SeqCst);

    let usable = slot.spec.is_some()
      && slot.key == *key
      && slot.page == page
      && !slot.rows.is_empty()
      && slot.total_count == total_count
      && !self.is_dirty(&slot);

    if usable && let Some(spec) = slot.spec.clone() {
      let rows = mem::take(&mut slot.rows);
      slot.generation += 1;
      slot.page = page + 1;
      debug!(key = %key, page, rows = rows.len(), "page cache hit");
      return Lookup::Hit(Hit {
        rows,
        spec,
        ticket: PrefetchTicket { page: page + 1, generation: slot.generation },
      });
    }

    if slot.spec.is_some() && slot.key != *key {
      debug!(old = %slot.key, new = %key, "query changed; discarding cached page");
      slot.replace(Slot::default());
    }
    debug!(key = %key, page, "page cache miss");
    Lookup::Miss { epoch }
  }

  /// Publish the result of a synchronous read as the new slot.
  pub async fn fill(&self, fill: Fill) {
    let mut slot = self.slot.lock().await;
    debug!(
      key = %fill.key,
      page = fill.page,
      rows = fill.rows.len(),
      "page cache filled"
    );
    slot.replace(Slot {
      spec: Some(fill.spec),
      key: fill.key,
      page: fill.page,
      rows: fill.rows,
      total_pages: fill.total_pages,
      total_count: fill.total_count,
      epoch: fill.epoch,
      ..Slot::default()
    });
  }

  /// Read `ticket.page` of `spec` on a detached task and publish the rows
  /// into the slot, provided the slot has not moved on in the meantime.
  pub async fn spawn_prefetch<S>(
    self: &Arc<Self>,
    store: Arc<S>,
    spec: QuerySpec,
    ticket: PrefetchTicket,
  ) where
    S: ContactStore + 'static,
  {
    let cache = Arc::clone(self);
    let task = tokio::spawn(async move {
      let result = store
        .search(&spec, ticket.page, false)
        .await
        .map_err(Into::<phonebook_core::Error>::into);
      cache.publish_prefetch(ticket, result).await;
    });

    let mut slot = self.slot.lock().await;
    if slot.generation == ticket.generation {
      slot.prefetch = Some(task);
    } else {
      task.abort();
    }
  }

  async fn publish_prefetch(
    &self,
    ticket: PrefetchTicket,
    result: phonebook_core::Result<Vec<Contact>>,
  ) {
    let mut slot = self.slot.lock().await;
    if slot.generation != ticket.generation {
      debug!(page = ticket.page, "slot replaced; dropping prefetched page");
      return;
    }
    slot.prefetch = None;

    match result {
      Ok(rows) if !rows.is_empty() => {
        debug!(page = ticket.page, rows = rows.len(), "prefetched page cached");
        slot.page = ticket.page;
        slot.rows = rows;
      }
      Ok(_) => {
        debug!(page = ticket.page, "prefetch found no rows; cache marked dirty");
        slot.stale = true;
      }
      Err(e) => {
        error!(page = ticket.page, error = %e, "prefetch failed; cache marked dirty");
        slot.stale = true;
      }
    }
  }

  /// Wait for the in-flight prefetch, if any, to publish.
  pub async fn join_prefetch(&self) {
    let task = self.slot.lock().await.prefetch.take();
    if let Some(task) = task {
      let _ = task.await;
    }
  }

  pub async fn snapshot(&self) -> CacheSnapshot {
    let slot = self.slot.lock().await;
    CacheSnapshot {
      key:         slot.spec.as_ref().map(|_| slot.key.to_string()),
      page:        slot.page,
      cached_rows: slot.rows.len(),
      total_pages: slot.total_pages,
      total_count: slot.total_count,
      dirty:       self.is_dirty(&slot),
    }
  }
}
