//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::{
  body::Body,
  http::{Request, Response, StatusCode},
};
use phonebook_core::store::ContactStore;
use phonebook_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, router};

async fn make_state() -> AppState<SqliteStore> {
  AppState::new(SqliteStore::open_in_memory().await.unwrap())
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  body: Option<Value>,
) -> Response<Body> {
  let body = body.map(|v| Body::from(v.to_string())).unwrap_or_default();
  let req = Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json")
    .body(body)
    .unwrap();
  router(state.clone()).oneshot(req).await.unwrap()
}

async fn json_body(resp: Response<Body>) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

fn john() -> Value {
  json!({
    "first_name": "John",
    "last_name": "Doe",
    "phone": "+1234567890",
    "address": "123 Main St"
  })
}

async fn add(state: &AppState<SqliteStore>, first: &str, phone: &str) -> i64 {
  let resp = send(
    state,
    "PUT",
    "/addContact",
    Some(json!({ "first_name": first, "phone": phone })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  json_body(resp).await["id"].as_i64().unwrap()
}

// ─── Add ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_contact_returns_stored_contact() {
  let state = make_state().await;
  let resp = send(&state, "PUT", "/addContact", Some(john())).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body = json_body(resp).await;
  assert_eq!(body["first_name"], "John");
  assert_eq!(body["address"], "123 Main St");
  assert!(body["id"].as_i64().unwrap() > 0);
  assert!(body["last_modified"].is_string());
}

#[tokio::test]
async fn add_duplicate_contact_is_400() {
  let state = make_state().await;
  send(&state, "PUT", "/addContact", Some(john())).await;

  let resp = send(&state, "PUT", "/addContact", Some(john())).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body = json_body(resp).await;
  assert_eq!(
    body["error"],
    "contact with the same full name and phone number already exists"
  );
  assert_eq!(state.store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn add_invalid_or_malformed_contact_is_400() {
  let state = make_state().await;

  let resp = send(
    &state,
    "PUT",
    "/addContact",
    Some(json!({ "last_name": "Doe", "phone": "+1234567890" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert!(json_body(resp).await["error"].is_string());

  let resp = send(&state, "PUT", "/addContact", Some(json!([1, 2]))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&state, "PUT", "/addContact", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ─── Bulk add ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn bulk_add_all_valid_is_200() {
  let state = make_state().await;
  let batch = json!([
    { "first_name": "Ann", "phone": "+15550001" },
    { "first_name": "Ben", "phone": "+15550002" },
    { "first_name": "Cat", "phone": "+15550003" },
  ]);
  let resp = send(&state, "PUT", "/addContacts", Some(batch)).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let body = json_body(resp).await;
  assert_eq!(body["successful_contacts"], 3);
  assert_eq!(body["failed_contacts"], json!([]));
  assert_eq!(body["errors"], json!([]));
}

#[tokio::test]
async fn bulk_add_partial_success_is_206() {
  let state = make_state().await;
  let bad = json!({ "first_name": "", "phone": "+15550003" });
  let batch = json!([
    { "first_name": "Ann", "phone": "+15550001" },
    bad.clone(),
    { "first_name": "Ben", "phone": "+15550002" },
  ]);
  let resp = send(&state, "PUT", "/addContacts", Some(batch)).await;
  assert_eq!(resp.status(), StatusCode::PARTIAL_CONTENT);

  let body = json_body(resp).await;
  assert_eq!(body["successful_contacts"], 2);
  assert_eq!(body["failed_contacts"], json!([bad]));
  assert_eq!(body["errors"].as_array().unwrap().len(), 1);
  assert_eq!(state.store.count().await.unwrap(), 2);
}

#[tokio::test]
async fn bulk_add_edge_cases() {
  let state = make_state().await;

  let resp = send(&state, "PUT", "/addContacts", Some(json!([]))).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["successful_contacts"], 0);

  // Nothing stored.
  let batch = json!([{ "first_name": "Ann", "phone": "x" }, 42]);
  let resp = send(&state, "PUT", "/addContacts", Some(batch)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(json_body(resp).await["errors"].as_array().unwrap().len(), 2);

  let too_many: Vec<Value> = (0..21)
    .map(|i| json!({ "first_name": format!("P{i}"), "phone": format!("+1555{i:04}") }))
    .collect();
  let resp = send(&state, "PUT", "/addContacts", Some(Value::Array(too_many))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&state, "PUT", "/addContacts", Some(john())).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  assert_eq!(state.store.count().await.unwrap(), 0);
}

// ─── List ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_contacts_pages_and_filters() {
  let state = make_state().await;
  for i in 1..=12 {
    add(&state, &format!("Person{i:02}"), &format!("+1555000{i:02}")).await;
  }

  let resp = send(&state, "GET", "/getContacts", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["total_pages"], 2);
  assert_eq!(body["current_page"], 1);
  assert_eq!(body["total_count"], 12);
  assert_eq!(body["contacts"].as_array().unwrap().len(), 10);

  let body = json_body(send(&state, "GET", "/getContacts?page=2", None).await).await;
  assert_eq!(body["current_page"], 2);
  assert_eq!(body["contacts"][0]["first_name"], "Person11");
  state.cache.join_prefetch().await;

  let body = json_body(
    send(&state, "GET", "/getContacts?first_name=son1&asc_dec=dec&page=9", None).await,
  )
  .await;
  assert_eq!(body["total_count"], 3);
  assert_eq!(body["current_page"], 1);
  assert_eq!(body["contacts"][0]["first_name"], "Person12");
}

#[tokio::test]
async fn write_through_api_invalidates_listing_cache() {
  let state = make_state().await;
  for i in 1..=15 {
    add(&state, &format!("Person{i:02}"), &format!("+1555000{i:02}")).await;
  }
  send(&state, "GET", "/getContacts", None).await;
  assert!(!state.cache.snapshot().await.dirty);

  add(&state, "Aaron", "+15559999").await;
  assert!(state.cache.snapshot().await.dirty);

  let body = json_body(send(&state, "GET", "/getContacts?page=2", None).await).await;
  assert_eq!(body["total_count"], 16);
  assert_eq!(body["contacts"][0]["first_name"], "Person10");
}

// ─── Update ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn update_contact_merges_fields() {
  let state = make_state().await;
  let resp = send(&state, "PUT", "/addContact", Some(john())).await;
  let id = json_body(resp).await["id"].as_i64().unwrap();

  let resp = send(
    &state,
    "POST",
    &format!("/updateContact/{id}"),
    Some(json!({ "last_name": "", "phone": "+1987654321" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["first_name"], "John");
  assert_eq!(body["last_name"], "");
  assert_eq!(body["phone"], "+1987654321");
  assert_eq!(body["address"], "123 Main St");
}

#[tokio::test]
async fn update_contact_errors() {
  let state = make_state().await;
  let id = add(&state, "John", "+1234567890").await;
  add(&state, "Jane", "+1234567890").await;

  let patch = json!({ "address": "somewhere" });
  let resp = send(&state, "POST", "/updateContact/999", Some(patch.clone())).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(json_body(resp).await["error"], "contact not found");

  let resp = send(&state, "POST", "/updateContact/abc", Some(patch)).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(&state, "POST", &format!("/updateContact/{id}"), Some(json!({}))).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(
    &state,
    "POST",
    &format!("/updateContact/{id}"),
    Some(json!({ "phone": "12" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

  let resp = send(
    &state,
    "POST",
    &format!("/updateContact/{id}"),
    Some(json!({ "first_name": "Jane" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_contact_then_404() {
  let state = make_state().await;
  let id = add(&state, "John", "+1234567890").await;

  let resp = send(&state, "DELETE", &format!("/deleteContact/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["deleted"], id);

  let resp = send(&state, "DELETE", &format!("/deleteContact/{id}"), None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = send(&state, "DELETE", "/deleteContact/1.5", None).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_delete_removes_all_listed() {
  let state = make_state().await;
  let a = add(&state, "Ann", "+15550001").await;
  let b = add(&state, "Ben", "+15550002").await;
  let c = add(&state, "Cat", "+15550003").await;

  let resp = send(&state, "DELETE", &format!("/deleteContacts?ids={a},{b},{c}"), None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["deleted"], json!([a, b, c]));
  assert_eq!(state.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn bulk_delete_stops_at_first_missing_id() {
  let state = make_state().await;
  let a = add(&state, "Ann", "+15550001").await;
  let b = add(&state, "Ben", "+15550002").await;

  let resp = send(
    &state,
    "DELETE",
    &format!("/deleteContacts?ids={a},999,{b}"),
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert!(state.store.get_contact(a).await.unwrap().is_none());
  assert!(state.store.get_contact(b).await.unwrap().is_some());
}

#[tokio::test]
async fn bulk_delete_rejects_bad_id_lists() {
  let state = make_state().await;
  let a = add(&state, "Ann", "+15550001").await;

  let uris = [
    "/deleteContacts".to_string(),
    "/deleteContacts?ids=".to_string(),
    format!("/deleteContacts?ids={a},x"),
  ];
  for uri in &uris {
    let resp = send(&state, "DELETE", uri, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
  }
  assert_eq!(state.store.count().await.unwrap(), 1);
}

// ─── Config ──────────────────────────────────────────────────────────────────

#[test]
fn server_config_defaults_fill_missing_keys() {
  let cfg: crate::ServerConfig = config::Config::builder()
    .set_override("port", 9000)
    .unwrap()
    .build()
    .unwrap()
    .try_deserialize()
    .unwrap();
  assert_eq!(cfg.port, 9000);
  assert_eq!(cfg.host, "127.0.0.1");
  assert_eq!(cfg.store_path, std::path::PathBuf::from("phonebook.db"));
}
