//! Contacts, the single record kind held by the phonebook.
//!
//! A contact is identified by a server-assigned integer id. The triple
//! (first name, last name, phone) is unique across the store; that rule is
//! enforced by the store at write time, not by a database constraint alone.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

static PHONE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^\+?[0-9]{4,20}$").expect("phone pattern is a valid regex")
});

/// Returns `true` if `phone` is 4–20 digits with an optional leading `+`.
pub fn is_valid_phone(phone: &str) -> bool { PHONE_PATTERN.is_match(phone) }

// ─── Contact ─────────────────────────────────────────────────────────────────

/// A stored contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub id:            i64,
  pub first_name:    String,
  /// Empty when not provided.
  pub last_name:     String,
  pub phone:         String,
  /// Free text; empty when not provided.
  pub address:       String,
  /// Server-assigned; refreshed on every mutation.
  pub last_modified: DateTime<Utc>,
}

// ─── NewContact ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContactStore::add_contact`].
///
/// Every field defaults to the empty string so that a payload missing
/// `first_name` decodes fine and is then rejected by [`NewContact::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContact {
  #[serde(default)]
  pub first_name: String,
  #[serde(default)]
  pub last_name:  String,
  #[serde(default)]
  pub phone:      String,
  #[serde(default)]
  pub address:    String,
}

impl NewContact {
  pub fn validate(&self) -> Result<()> {
    if self.first_name.trim().is_empty() {
      return Err(Error::Validation("first_name is required".into()));
    }
    if self.phone.is_empty() {
      return Err(Error::Validation("phone is required".into()));
    }
    if !is_valid_phone(&self.phone) {
      return Err(Error::Validation(format!(
        "phone {:?} must be 4-20 digits with an optional leading '+'",
        self.phone
      )));
    }
    Ok(())
  }
}

// ─── ContactPatch ────────────────────────────────────────────────────────────

/// Input to [`crate::store::ContactStore::update_contact`].
///
/// `None` leaves the stored value untouched. `Some` replaces it, so
/// `last_name` and `address` can be cleared with `Some("")`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPatch {
  #[serde(default)]
  pub first_name: Option<String>,
  #[serde(default)]
  pub last_name:  Option<String>,
  #[serde(default)]
  pub phone:      Option<String>,
  #[serde(default)]
  pub address:    Option<String>,
}

impl ContactPatch {
  pub fn is_empty(&self) -> bool {
    self.first_name.is_none()
      && self.last_name.is_none()
      && self.phone.is_none()
      && self.address.is_none()
  }

  /// Reject values that would leave the merged contact invalid.
  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::Validation("update body sets no fields".into()));
    }
    if let Some(first) = &self.first_name
      && first.trim().is_empty()
    {
      return Err(Error::Validation("first_name cannot be empty".into()));
    }
    if let Some(phone) = &self.phone
      && !is_valid_phone(phone)
    {
      return Err(Error::Validation(format!(
        "phone {phone:?} must be 4-20 digits with an optional leading '+'"
      )));
    }
    Ok(())
  }

  /// Merge the set fields onto `contact`. Does not touch `id` or
  /// `last_modified`.
  pub fn apply(self, contact: &mut Contact) {
    if let Some(v) = self.first_name {
      contact.first_name = v;
    }
    if let Some(v) = self.last_name {
      contact.last_name = v;
    }
    if let Some(v) = self.phone {
      contact.phone = v;
    }
    if let Some(v) = self.address {
      contact.address = v;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn jane() -> Contact {
    Contact {
      id:            7,
      first_name:    "Jane".into(),
      last_name:     "Doe".into(),
      phone:         "+1234567890".into(),
      address:       "456 Elm St".into(),
      last_modified: Utc::now(),
    }
  }

  #[test]
  fn phone_pattern() {
    assert!(is_valid_phone("1234"));
    assert!(is_valid_phone("+12345678901234567890"));
    assert!(!is_valid_phone("123"));
    assert!(!is_valid_phone("+123456789012345678901"));
    assert!(!is_valid_phone("555-1234"));
    assert!(!is_valid_phone("++1234"));
  }

  #[test]
  fn new_contact_requires_first_name_and_phone() {
    let missing_first: NewContact =
      serde_json::from_str(r#"{"last_name":"Doe","phone":"+1234567890"}"#)
        .unwrap();
    assert!(matches!(missing_first.validate(), Err(Error::Validation(_))));

    let bad_phone = NewContact {
      first_name: "John".into(),
      phone: "call me".into(),
      ..Default::default()
    };
    assert!(matches!(bad_phone.validate(), Err(Error::Validation(_))));

    let ok = NewContact {
      first_name: "John".into(),
      phone: "+1234567890".into(),
      ..Default::default()
    };
    assert!(ok.validate().is_ok());
  }

  #[test]
  fn patch_leaves_absent_fields_alone() {
    let patch: ContactPatch =
      serde_json::from_str(r#"{"address":"1 New Rd"}"#).unwrap();
    let mut c = jane();
    patch.apply(&mut c);
    assert_eq!(c.first_name, "Jane");
    assert_eq!(c.last_name, "Doe");
    assert_eq!(c.address, "1 New Rd");
  }

  #[test]
  fn patch_can_clear_optional_fields() {
    let patch: ContactPatch =
      serde_json::from_str(r#"{"last_name":"","address":null}"#).unwrap();
    assert!(patch.validate().is_ok());
    let mut c = jane();
    patch.apply(&mut c);
    assert_eq!(c.last_name, "");
    assert_eq!(c.address, "456 Elm St");
  }

  #[test]
  fn patch_rejects_empty_first_name_and_empty_body() {
    let blank_first = ContactPatch {
      first_name: Some("  ".into()),
      ..Default::default()
    };
    assert!(matches!(blank_first.validate(), Err(Error::Validation(_))));
    assert!(matches!(
      ContactPatch::default().validate(),
      Err(Error::Validation(_))
    ));
  }
}
