//! Handlers for the contact endpoints.
//!
//! Request bodies are taken as raw bytes and decoded here so that every
//! malformed payload is answered with a JSON 400 rather than axum's default
//! rejection.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use bytes::Bytes;
use phonebook_core::{
  contact::{Contact, ContactPatch, NewContact},
  store::ContactStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::{
  AppState, ApiError,
  listing::{self, ContactPage, ListParams},
};

/// Most contacts accepted by one bulk add, and most ids by one bulk delete.
pub const MAX_BATCH: usize = 20;

fn parse_id(raw: &str) -> Result<i64, ApiError> {
  raw.trim().parse().map_err(|_| {
    ApiError::BadRequest(format!("invalid id {raw:?}, ids can only be integers"))
  })
}

fn decode<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
  serde_json::from_slice(body).map_err(|e| {
    warn!(error = %e, "rejecting malformed request body");
    ApiError::BadRequest(format!("invalid request body: {e}"))
  })
}

// ─── Add ─────────────────────────────────────────────────────────────────────

/// `PUT /addContact`
pub async fn add_one<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<Json<Contact>, ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let input: NewContact = decode(&body)?;
  let contact = state
    .store
    .add_contact(input)
    .await
    .map_err(ApiError::from_store)?;
  state.cache.invalidate();
  info!(id = contact.id, "contact added");
  Ok(Json(contact))
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct BulkAddResponse {
  pub successful_contacts: usize,
  /// The payloads that were rejected, as submitted.
  pub failed_contacts:     Vec<Value>,
  /// One message per entry in `failed_contacts`, in the same order.
  pub errors:              Vec<String>,
}

/// `PUT /addContacts`
///
/// Each payload is inserted on its own; one failure does not stop the rest.
/// Answers 200 when every payload was stored, 206 when only some were and
/// 400 when none were.
pub async fn add_many<S>(
  State(state): State<AppState<S>>,
  body: Bytes,
) -> Result<(StatusCode, Json<BulkAddResponse>), ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let payloads: Vec<Value> = decode(&body)?;
  if payloads.len() > MAX_BATCH {
    return Err(ApiError::BadRequest(format!(
      "at most {MAX_BATCH} contacts can be added at once"
    )));
  }

  let submitted = payloads.len();
  let mut report = BulkAddResponse::default();
  for payload in payloads {
    let input = match serde_json::from_value::<NewContact>(payload.clone()) {
      Ok(input) => input,
      Err(e) => {
        warn!(error = %e, "rejecting malformed contact in batch");
        report.errors.push(format!("invalid contact payload: {e}"));
        report.failed_contacts.push(payload);
        continue;
      }
    };

    match state.store.add_contact(input).await {
      Ok(contact) => {
        state.cache.invalidate();
        info!(id = contact.id, "contact added");
        report.successful_contacts += 1;
      }
      Err(e) => {
        let e: phonebook_core::Error = e.into();
        if matches!(e, phonebook_core::Error::Store(_)) {
          error!(error = %e, "failed to add contact in batch");
        } else {
          warn!(error = %e, "rejected contact in batch");
        }
        report.errors.push(e.to_string());
        report.failed_contacts.push(payload);
      }
    }
  }

  let status = if report.successful_contacts == submitted {
    StatusCode::OK
  } else if report.successful_contacts > 0 {
    StatusCode::PARTIAL_CONTENT
  } else {
    StatusCode::BAD_REQUEST
  };
  Ok((status, Json(report)))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /getContacts`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<ContactPage>, ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let page = listing::list_contacts(&state.store, &state.cache, &params).await?;
  Ok(Json(page))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `POST /updateContact/{id}`
pub async fn update_one<S>(
  State(state): State<AppState<S>>,
  Path(raw_id): Path<String>,
  body: Bytes,
) -> Result<Json<Contact>, ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let id = parse_id(&raw_id)?;
  let patch: ContactPatch = decode(&body)?;
  let contact = state
    .store
    .update_contact(id, patch)
    .await
    .map_err(ApiError::from_store)?;
  state.cache.invalidate();
  info!(id, "contact updated");
  Ok(Json(contact))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /deleteContact/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Path(raw_id): Path<String>,
) -> Result<Json<Value>, ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let id = parse_id(&raw_id)?;
  state
    .store
    .delete_contact(id)
    .await
    .map_err(ApiError::from_store)?;
  state.cache.invalidate();
  info!(id, "contact deleted");
  Ok(Json(json!({ "deleted": id })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteManyParams {
  pub ids: Option<String>,
}

fn parse_ids(raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
  let raw = raw.map(str::trim).unwrap_or_default();
  if raw.is_empty() {
    return Err(ApiError::BadRequest("no ids given".into()));
  }
  let ids = raw.split(',').map(parse_id).collect::<Result<Vec<_>, _>>()?;
  if ids.len() > MAX_BATCH {
    return Err(ApiError::BadRequest(format!(
      "at most {MAX_BATCH} contacts can be deleted at once"
    )));
  }
  Ok(ids)
}

/// `DELETE /deleteContacts?ids=1,2,3`
///
/// Deletes in order and stops at the first id that does not exist. Contacts
/// deleted before that point stay deleted.
pub async fn delete_many<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<DeleteManyParams>,
) -> Result<Json<Value>, ApiError>
where
  S: ContactStore + Clone + 'static,
{
  let ids = parse_ids(params.ids.as_deref())?;
  for &id in &ids {
    match state
      .store
      .delete_contact(id)
      .await
      .map_err(Into::<phonebook_core::Error>::into)
    {
      Ok(()) => {
        state.cache.invalidate();
        info!(id, "contact deleted");
      }
      Err(phonebook_core::Error::NotFound(_)) => {
        return Err(ApiError::NotFound(format!("no contact found with id {id}")));
      }
      Err(e) => return Err(e.into()),
    }
  }
  Ok(Json(json!({ "deleted": ids })))
}
