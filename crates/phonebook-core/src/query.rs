//! Query specifications, canonical query keys and pagination arithmetic.
//!
//! A [`QuerySpec`] is a plain value: the store re-executes it for every page
//! requested, so it can be cloned into background tasks freely. Its
//! [`QueryKey`] is the token used to decide whether two listing requests ask
//! for the same result set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rows per page. Fixed.
pub const PAGE_SIZE: usize = 10;

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Case-insensitive "contains" predicates. `None` and empty strings match
/// everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFilter {
  pub first_name: Option<String>,
  pub last_name:  Option<String>,
  pub address:    Option<String>,
  pub phone:      Option<String>,
}

impl ContactFilter {
  /// Drop empty strings so that `Some("")` and `None` behave identically.
  pub fn normalized(self) -> Self {
    fn keep(v: Option<String>) -> Option<String> {
      v.filter(|s| !s.is_empty())
    }
    Self {
      first_name: keep(self.first_name),
      last_name:  keep(self.last_name),
      address:    keep(self.address),
      phone:      keep(self.phone),
    }
  }
}

// ─── Sort ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
  #[default]
  FirstName,
  LastName,
  LastModified,
}

impl SortField {
  /// Unknown or empty input falls back to [`SortField::FirstName`].
  pub fn parse(s: &str) -> Self {
    match s.trim().to_ascii_lowercase().as_str() {
      "last_name" => Self::LastName,
      "last_modified" => Self::LastModified,
      _ => Self::FirstName,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::FirstName => "first_name",
      Self::LastName => "last_name",
      Self::LastModified => "last_modified",
    }
  }

  /// Most recent first for `last_modified`; alphabetical otherwise.
  pub fn default_ascending(self) -> bool { !matches!(self, Self::LastModified) }
}

/// Resolve the `asc_dec` request parameter. `asc` and `dec`/`desc` override
/// the sort field's default; anything else keeps it.
pub fn parse_direction(raw: Option<&str>, sort_by: SortField) -> bool {
  match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
    Some("asc") => true,
    Some("dec" | "desc") => false,
    _ => sort_by.default_ascending(),
  }
}

// ─── QuerySpec ───────────────────────────────────────────────────────────────

/// A complete, re-executable description of one listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySpec {
  pub filter:    ContactFilter,
  pub sort_by:   SortField,
  pub ascending: bool,
}

impl QuerySpec {
  pub fn new(filter: ContactFilter, sort_by: SortField, ascending: bool) -> Self {
    Self { filter: filter.normalized(), sort_by, ascending }
  }

  /// The canonical key for this spec. The sort field and direction are part
  /// of the key, so changing either never reuses a cached page.
  pub fn key(&self) -> QueryKey {
    let asc = if self.ascending { "true" } else { "false" };
    build_key([
      ("first_name", self.filter.first_name.as_deref().unwrap_or_default()),
      ("last_name", self.filter.last_name.as_deref().unwrap_or_default()),
      ("address", self.filter.address.as_deref().unwrap_or_default()),
      ("phone", self.filter.phone.as_deref().unwrap_or_default()),
      ("sort_by", self.sort_by.as_str()),
      ("asc_dec", asc),
    ])
  }
}

/// A [`QuerySpec`] paired with the number of rows it matched when it was
/// built. Returned by [`crate::store::ContactStore::filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredQuery {
  pub spec:        QuerySpec,
  pub total_count: u64,
}

impl FilteredQuery {
  pub fn total_pages(&self) -> u32 { total_pages(self.total_count) }
}

// ─── QueryKey ────────────────────────────────────────────────────────────────

/// Canonical `key=value&...` form of a set of query parameters.
///
/// Equality ignores case: `first_name=ann` and `first_name=ANN` select the
/// same rows under case-insensitive matching, so they share a key.
#[derive(Debug, Clone, Default, Eq)]
pub struct QueryKey(String);

impl QueryKey {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl PartialEq for QueryKey {
  fn eq(&self, other: &Self) -> bool { fold_case(&self.0) == fold_case(&other.0) }
}

/// Per-character Unicode lowercase. Filter matching in stores and
/// [`QueryKey`] equality both go through this, so two filters share a key
/// exactly when they select the same rows.
pub fn fold_case(s: &str) -> String { s.chars().flat_map(char::to_lowercase).collect() }

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Build a canonical key from `(name, value)` pairs: empty values are
/// dropped, the rest are sorted by name and joined with `&`.
pub fn build_key<'a>(
  pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> QueryKey {
  let mut parts: Vec<String> = pairs
    .into_iter()
    .filter(|(_, v)| !v.is_empty())
    .map(|(k, v)| format!("{k}={v}"))
    .collect();
  parts.sort();
  QueryKey(parts.join("&"))
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// `ceil(total_count / PAGE_SIZE)`.
pub fn total_pages(total_count: u64) -> u32 {
  let pages = total_count.div_ceil(PAGE_SIZE as u64);
  u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Parse the requested page. Missing, non-numeric, zero or past-the-end
/// input all resolve to page 1.
pub fn resolve_page(raw: Option<&str>, total_pages: u32) -> u32 {
  match raw.and_then(|s| s.trim().parse::<u32>().ok()) {
    Some(p) if p >= 1 && p <= total_pages => p,
    _ => 1,
  }
}

/// Zero-based row offset of the first row on `page`.
pub fn page_offset(page: u32) -> usize {
  (page.max(1) as usize - 1) * PAGE_SIZE
}
