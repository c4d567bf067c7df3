//! SQL schema for the phonebook SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// The identity triple is indexed, not `UNIQUE`; the store checks for
/// duplicates itself before every insert and update.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS contacts (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL DEFAULT '',
    phone         TEXT NOT NULL,
    address       TEXT NOT NULL DEFAULT '',
    last_modified TEXT NOT NULL    -- RFC 3339 UTC, fixed-width micros
);

CREATE INDEX IF NOT EXISTS contacts_identity_idx
    ON contacts(first_name, last_name, phone);
CREATE INDEX IF NOT EXISTS contacts_modified_idx ON contacts(last_modified);

PRAGMA user_version = 1;
";
