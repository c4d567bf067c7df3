//! Domain model of the phonebook: contacts, listing queries, the storage
//! trait and the shared error type.
//!
//! Nothing here talks HTTP or SQL; `phonebook-store-sqlite` implements
//! [`store::ContactStore`] and `phonebook-api` serves it.

pub mod contact;
pub mod error;
pub mod query;
pub mod store;

pub use error::{Error, Result};
