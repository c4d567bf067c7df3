//! The listing read path: filter, count, page, and consult the cache.

use std::sync::Arc;

use phonebook_core::{
  Error,
  contact::Contact,
  query::{
    ContactFilter, PAGE_SIZE, QuerySpec, SortField, parse_direction, resolve_page,
  },
  store::ContactStore,
};
use serde::{Deserialize, Serialize};

use crate::cache::{Fill, Lookup, PageCache};

/// Query parameters of `GET /getContacts`. Everything is optional and
/// arrives as text; unparseable values fall back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
  pub page:       Option<String>,
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub address:    Option<String>,
  pub phone:      Option<String>,
  pub sort_by:    Option<String>,
  pub asc_dec:    Option<String>,
}

impl ListParams {
  pub fn spec(&self) -> QuerySpec {
    let sort_by = self
      .sort_by
      .as_deref()
      .map(SortField::parse)
      .unwrap_or_default();
    let ascending = parse_direction(self.asc_dec.as_deref(), sort_by);
    QuerySpec::new(
      ContactFilter {
        first_name: self.first_name.clone(),
        last_name:  self.last_name.clone(),
        address:    self.address.clone(),
        phone:      self.phone.clone(),
      },
      sort_by,
      ascending,
    )
  }
}

/// One page of a listing, as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPage {
  pub contacts:     Vec<Contact>,
  pub total_pages:  u32,
  pub current_page: u32,
  pub total_count:  u64,
}

/// Serve one page of contacts, from the cache when it holds exactly the page
/// asked for and from the store otherwise.
///
/// A cache hit schedules a background read of the following page. A miss
/// reads up to two pages, answers with the first and caches the rest.
pub async fn list_contacts<S>(
  store: &Arc<S>,
  cache: &Arc<PageCache>,
  params: &ListParams,
) -> Result<ContactPage, Error>
where
  S: ContactStore + 'static,
{
  let spec = params.spec();
  let key = spec.key();

  let filtered = store.filter(spec).await.map_err(Into::<Error>::into)?;
  let total_pages = filtered.total_pages();
  let total_count = filtered.total_count;
  let page = resolve_page(params.page.as_deref(), total_pages);

  match cache.lookup(&key, page, total_count).await {
    Lookup::Hit(hit) => {
      cache
        .spawn_prefetch(Arc::clone(store), hit.spec, hit.ticket)
        .await;
      Ok(ContactPage {
        contacts: hit.rows,
        total_pages,
        current_page: page,
        total_count,
      })
    }
    Lookup::Miss { epoch } => {
      let mut contacts = store
        .search(&filtered.spec, page, true)
        .await
        .map_err(Into::<Error>::into)?;
      let rest = if contacts.len() > PAGE_SIZE {
        contacts.split_off(PAGE_SIZE)
      } else {
        Vec::new()
      };

      cache
        .fill(Fill {
          spec: filtered.spec,
          key,
          page: page + 1,
          rows: rest,
          total_pages,
          total_count,
          epoch,
        })
        .await;

      Ok(ContactPage { contacts, total_pages, current_page: page, total_count })
    }
  }
}
