//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that sorting the
//! column as text sorts it chronologically.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use rusqlite::functions::FunctionFlags;
use phonebook_core::{
  contact::Contact,
  query::{ContactFilter, SortField, fold_case},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time, truncated to the precision [`encode_dt`] keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Filters ─────────────────────────────────────────────────────────────────

/// `%needle%` with LIKE wildcards in `needle` escaped by `\`.
pub fn like_pattern(needle: &str) -> String {
  let mut out = String::with_capacity(needle.len() + 2);
  out.push('%');
  for ch in needle.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(ch);
  }
  out.push('%');
  out
}

/// LIKE patterns for `(first_name, last_name, address, phone)`, in that
/// order; `None` matches every row. Needles are case-folded to match the
/// `fold()` applied to the columns in [`FILTER_CLAUSE`].
pub type FilterPatterns =
  (Option<String>, Option<String>, Option<String>, Option<String>);

pub fn filter_patterns(filter: &ContactFilter) -> FilterPatterns {
  let p = |v: &Option<String>| {
    v.as_deref()
      .filter(|s| !s.is_empty())
      .map(|s| like_pattern(&fold_case(s)))
  };
  (
    p(&filter.first_name),
    p(&filter.last_name),
    p(&filter.address),
    p(&filter.phone),
  )
}

/// Register `fold(text)`, SQL's view of [`fold_case`]. SQLite's own `LIKE`
/// only ignores ASCII case. Must run on every connection before
/// [`FILTER_CLAUSE`] is used.
pub fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|s| fold_case(&s))),
  )
}

/// WHERE clause shared by the count and page queries. Binds `?1`..`?4`.
pub const FILTER_CLAUSE: &str = "
  (?1 IS NULL OR fold(first_name) LIKE ?1 ESCAPE '\\')
  AND (?2 IS NULL OR fold(last_name) LIKE ?2 ESCAPE '\\')
  AND (?3 IS NULL OR fold(address) LIKE ?3 ESCAPE '\\')
  AND (?4 IS NULL OR fold(phone) LIKE ?4 ESCAPE '\\')";

// ─── Sorting ─────────────────────────────────────────────────────────────────

/// ORDER BY clause for a sort field; `id` breaks ties so pages are stable.
pub fn order_clause(sort_by: SortField, ascending: bool) -> &'static str {
  match (sort_by, ascending) {
    (SortField::FirstName, true) => "first_name COLLATE NOCASE ASC, id ASC",
    (SortField::FirstName, false) => "first_name COLLATE NOCASE DESC, id DESC",
    (SortField::LastName, true) => "last_name COLLATE NOCASE ASC, id ASC",
    (SortField::LastName, false) => "last_name COLLATE NOCASE DESC, id DESC",
    (SortField::LastModified, true) => "last_modified ASC, id ASC",
    (SortField::LastModified, false) => "last_modified DESC, id DESC",
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CONTACT_COLUMNS: &str =
  "id, first_name, last_name, phone, address, last_modified";

/// Raw values read directly from a `contacts` row.
pub struct RawContact {
  pub id:            i64,
  pub first_name:    String,
  pub last_name:     String,
  pub phone:         String,
  pub address:       String,
  pub last_modified: String,
}

impl RawContact {
  /// Map a row selected with [`CONTACT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawContact {
      id:            row.get(0)?,
      first_name:    row.get(1)?,
      last_name:     row.get(2)?,
      phone:         row.get(3)?,
      address:       row.get(4)?,
      last_modified: row.get(5)?,
    })
  }

  /// Build a contact without parsing the stored timestamp; used when the
  /// caller is about to overwrite `last_modified` anyway.
  pub fn with_timestamp(self, last_modified: DateTime<Utc>) -> Contact {
    Contact {
      id: self.id,
      first_name: self.first_name,
      last_name: self.last_name,
      phone: self.phone,
      address: self.address,
      last_modified,
    }
  }

  pub fn into_contact(self) -> Result<Contact> {
    Ok(Contact {
      id:            self.id,
      first_name:    self.first_name,
      last_name:     self.last_name,
      phone:         self.phone,
      address:       self.address,
      last_modified: decode_dt(&self.last_modified)?,
    })
  }
}
