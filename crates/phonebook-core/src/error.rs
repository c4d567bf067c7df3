//! Error types for `phonebook-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required field is missing or malformed.
  #[error("validation error: {0}")]
  Validation(String),

  /// Another contact already has the same first name, last name and phone.
  #[error("contact with the same full name and phone number already exists")]
  Duplicate,

  #[error("contact not found: {0}")]
  NotFound(i64),

  /// Any other persistence failure. The message carries the backend cause.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
