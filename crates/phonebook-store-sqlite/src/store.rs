//! The SQLite implementation of [`ContactStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;

use phonebook_core::{
  contact::{Contact, ContactPatch, NewContact},
  query::{FilteredQuery, PAGE_SIZE, QuerySpec, page_offset},
  store::ContactStore,
};

use crate::{
  Result,
  encode::{
    CONTACT_COLUMNS, FILTER_CLAUSE, RawContact, encode_dt, filter_patterns, now,
    order_clause, register_fold,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A phonebook store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. All calls
/// run one at a time on the connection's worker thread, so a check-then-write
/// inside a single `call` closure cannot interleave with another write.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Result of an update that may be refused for domain reasons.
enum UpdateOutcome {
  Updated(Contact),
  Duplicate,
  NotFound,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an empty in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_fold(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// Is the identity triple held by any contact other than `except`?
fn identity_taken(
  conn:   &rusqlite::Connection,
  first:  &str,
  last:   &str,
  phone:  &str,
  except: Option<i64>,
) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM contacts
         WHERE first_name = ?1 AND last_name = ?2 AND phone = ?3
           AND (?4 IS NULL OR id != ?4)
         LIMIT 1",
        rusqlite::params![first, last, phone, except],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

// ─── ContactStore impl ───────────────────────────────────────────────────────

impl ContactStore for SqliteStore {
  type Error = crate::Error;

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn add_contact(&self, input: NewContact) -> Result<Contact> {
    input.validate()?;

    let last_modified = now();
    let at_str = encode_dt(last_modified);
    let row = input.clone();

    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if identity_taken(&tx, &row.first_name, &row.last_name, &row.phone, None)? {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO contacts (first_name, last_name, phone, address, last_modified)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![
            row.first_name,
            row.last_name,
            row.phone,
            row.address,
            at_str,
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    let id = inserted.ok_or(phonebook_core::Error::Duplicate)?;
    Ok(Contact {
      id,
      first_name: input.first_name,
      last_name: input.last_name,
      phone: input.phone,
      address: input.address,
      last_modified,
    })
  }

  async fn update_contact(&self, id: i64, patch: ContactPatch) -> Result<Contact> {
    patch.validate()?;

    let last_modified = now();
    let at_str = encode_dt(last_modified);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
            rusqlite::params![id],
            RawContact::from_row,
          )
          .optional()?;
        let Some(raw) = existing else {
          return Ok(UpdateOutcome::NotFound);
        };

        let mut contact = raw.with_timestamp(last_modified);
        patch.apply(&mut contact);

        if identity_taken(
          &tx,
          &contact.first_name,
          &contact.last_name,
          &contact.phone,
          Some(id),
        )? {
          return Ok(UpdateOutcome::Duplicate);
        }

        tx.execute(
          "UPDATE contacts
           SET first_name = ?1, last_name = ?2, phone = ?3, address = ?4,
               last_modified = ?5
           WHERE id = ?6",
          rusqlite::params![
            contact.first_name,
            contact.last_name,
            contact.phone,
            contact.address,
            at_str,
            id,
          ],
        )?;
        tx.commit()?;
        Ok(UpdateOutcome::Updated(contact))
      })
      .await?;

    match outcome {
      UpdateOutcome::Updated(contact) => Ok(contact),
      UpdateOutcome::Duplicate => Err(phonebook_core::Error::Duplicate.into()),
      UpdateOutcome::NotFound => Err(phonebook_core::Error::NotFound(id).into()),
    }
  }

  async fn delete_contact(&self, id: i64) -> Result<()> {
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM contacts WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    if deleted == 0 {
      return Err(phonebook_core::Error::NotFound(id).into());
    }
    Ok(())
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
    let raw: Option<RawContact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
              rusqlite::params![id],
              RawContact::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContact::into_contact).transpose()
  }

  async fn filter(&self, spec: QuerySpec) -> Result<FilteredQuery> {
    let (first, last, address, phone) = filter_patterns(&spec.filter);

    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &format!("SELECT COUNT(*) FROM contacts WHERE {FILTER_CLAUSE}"),
          rusqlite::params![first, last, address, phone],
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(FilteredQuery {
      spec,
      total_count: u64::try_from(count).unwrap_or_default(),
    })
  }

  async fn search(
    &self,
    spec: &QuerySpec,
    page: u32,
    fetch_expanded: bool,
  ) -> Result<Vec<Contact>> {
    let (first, last, address, phone) = filter_patterns(&spec.filter);
    let order = order_clause(spec.sort_by, spec.ascending);
    let pages = if fetch_expanded { 2 } else { 1 };
    let limit_val = (PAGE_SIZE * pages) as i64;
    let offset_val = page_offset(page) as i64;

    let raws: Vec<RawContact> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {CONTACT_COLUMNS} FROM contacts
           WHERE {FILTER_CLAUSE}
           ORDER BY {order}
           LIMIT ?5 OFFSET ?6"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![first, last, address, phone, limit_val, offset_val],
            RawContact::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContact::into_contact).collect()
  }

  async fn count(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?)
      })
      .await?;
    Ok(u64::try_from(count).unwrap_or_default())
  }
}
