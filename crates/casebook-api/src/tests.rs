use std::sync::Arc;

use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version, password_hash::SaltString};
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use casebook_core::{
  actor::{Actor, Role},
  report::LieutenantFallback,
  store::{CaseStore, NewActor},
};
use casebook_store_sqlite::SqliteStore;
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

const PASSWORD: &str = "secret";

/// Cheap argon2 parameters so tests don't spend seconds per request.
fn cheap_hash(password: &str) -> String {
  let params = Params::new(8, 1, 1, None).unwrap();
  let salt   = SaltString::generate(&mut OsRng);
  Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    .hash_password(password.as_bytes(), &salt)
    .unwrap()
    .to_string()
}

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(Arc::new(store), LieutenantFallback::default())
}

async fn add_actor(state: &AppState<SqliteStore>, username: &str, role: Role) -> Actor {
  state
    .store
    .add_actor(NewActor {
      username:      username.into(),
      role,
      password_hash: cheap_hash(PASSWORD),
    })
    .await
    .unwrap()
}

fn auth_header(user: &str, pass: &str) -> String {
  format!("Basic {}", B64.encode(format!("{user}:{pass}")))
}

async fn call(
  state:   &AppState<SqliteStore>,
  method:  &str,
  uri:     &str,
  user:    Option<&str>,
  headers: Vec<(header::HeaderName, &str)>,
  body:    Option<Value>,
) -> Response {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(user) = user {
    builder = builder.header(header::AUTHORIZATION, auth_header(user, PASSWORD));
  }
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };
  api_router(state.clone()).oneshot(req).await.unwrap()
}

async fn send(
  state:  &AppState<SqliteStore>,
  method: &str,
  uri:    &str,
  user:   &str,
  body:   Option<Value>,
) -> Response {
  call(state, method, uri, Some(user), vec![], body).await
}

async fn json_body(resp: Response) -> Value {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(resp: Response) -> String {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

fn zone(city: &str) -> Value {
  json!({ "neighborhood": "", "locality": "", "city": city, "province": "Santa Fe" })
}

// ── Authentication ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_credentials_are_challenged() {
  let state = make_state().await;
  let resp  = call(&state, "GET", "/profiles", None, vec![], None).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  assert!(resp.headers().contains_key(header::WWW_AUTHENTICATE));
}

#[tokio::test]
async fn wrong_password_is_rejected() {
  let state = make_state().await;
  add_actor(&state, "ana", Role::Editor).await;
  let resp = call(
    &state,
    "GET",
    "/me",
    None,
    vec![(header::AUTHORIZATION, auth_header("ana", "wrong").as_str())],
    None,
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_returns_the_resolved_actor() {
  let state = make_state().await;
  let ana   = add_actor(&state, "ana", Role::ReportsOfficer).await;
  let resp  = send(&state, "GET", "/me", "ana", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body = json_body(resp).await;
  assert_eq!(body["actor_id"], json!(ana.actor_id));
  assert_eq!(body["role"], "reports_officer");
}

#[tokio::test]
async fn only_administrators_create_actors() {
  let state = make_state().await;
  add_actor(&state, "root", Role::Administrator).await;
  add_actor(&state, "ed", Role::Editor).await;

  let body = json!({ "username": "pat", "role": "press_officer", "password": "pw" });
  let resp = send(&state, "POST", "/actors", "ed", Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "POST", "/actors", "root", Some(body.clone())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);

  let resp = send(&state, "POST", "/actors", "root", Some(body)).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

  let creds = state.store.find_credentials("pat").await.unwrap().unwrap();
  assert_ne!(creds.password_hash, "pw");
}

// ── Profiles ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn role_gate_returns_fixed_forbidden_body() {
  let state = make_state().await;
  add_actor(&state, "cli", Role::Client).await;
  let resp = send(&state, "POST", "/profiles", "cli", Some(json!({ "surname": "Ruiz" }))).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(json_body(resp).await["error"], "forbidden");
}

#[tokio::test]
async fn reports_officers_only_reach_their_own_profiles() {
  let state = make_state().await;
  add_actor(&state, "ro1", Role::ReportsOfficer).await;
  add_actor(&state, "ro2", Role::ReportsOfficer).await;

  let resp = send(
    &state,
    "POST",
    "/profiles",
    "ro1",
    Some(json!({ "surname": "Ruiz", "name": "Juan", "document": "12345678" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let id = json_body(resp).await["profile_id"].as_str().unwrap().to_owned();

  let resp = send(&state, "GET", &format!("/profiles/{id}"), "ro1", None).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let resp = send(&state, "GET", &format!("/profiles/{id}"), "ro2", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "GET", "/profiles", "ro2", None).await;
  assert_eq!(json_body(resp).await, json!([]));

  let missing = uuid::Uuid::new_v4();
  let resp = send(&state, "GET", &format!("/profiles/{missing}"), "ro2", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let resp = send(&state, "DELETE", &format!("/profiles/{id}"), "ro2", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = send(&state, "DELETE", &format!("/profiles/{id}"), "ro1", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "GET", &format!("/profiles/{id}"), "ro1", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn only_administrators_and_management_delete_profiles() {
  let state = make_state().await;
  add_actor(&state, "ro", Role::ReportsOfficer).await;
  add_actor(&state, "chief", Role::Management).await;

  let resp = send(
    &state,
    "POST",
    "/profiles",
    "ro",
    Some(json!({ "surname": "Paz", "name": "Ana", "document": "20111222" })),
  )
  .await;
  let id = json_body(resp).await["profile_id"].as_str().unwrap().to_owned();

  let resp = send(&state, "DELETE", &format!("/profiles/{id}"), "ro", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  assert_eq!(json_body(resp).await["error"], "forbidden");

  let resp = send(&state, "DELETE", &format!("/profiles/{id}"), "chief", None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = send(&state, "GET", &format!("/profiles/{id}"), "chief", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validation_errors_carry_field_messages() {
  let state = make_state().await;
  add_actor(&state, "root", Role::Administrator).await;

  let resp = send(
    &state,
    "POST",
    "/profiles",
    "root",
    Some(json!({ "surname": "Ruiz", "document": "12-AB" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  let body = json_body(resp).await;
  assert_eq!(body["fields"][0]["field"], "document");

  let profile = json!({ "surname": "Ruiz", "document": "12345678" });
  let resp = send(&state, "POST", "/profiles", "root", Some(profile.clone())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let resp = send(&state, "POST", "/profiles", "root", Some(profile)).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// ── Links ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn links_are_visible_to_consumers_once_approved() {
  let state = make_state().await;
  add_actor(&state, "press", Role::PressOfficer).await;
  add_actor(&state, "press2", Role::PressOfficer).await;
  add_actor(&state, "clf", Role::Classifier).await;
  add_actor(&state, "cli", Role::Client).await;

  let resp = send(
    &state,
    "POST",
    "/links",
    "press",
    Some(json!({ "url": "https://news.example/a", "outlet": "La Capital" })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let link = json_body(resp).await;
  assert_eq!(link["status"], "pending");
  let id = link["link_id"].as_str().unwrap().to_owned();

  let resp = send(&state, "GET", "/links", "cli", None).await;
  assert_eq!(json_body(resp).await, json!([]));
  let resp = send(&state, "GET", &format!("/links/{id}"), "press2", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(
    &state,
    "POST",
    &format!("/links/{id}/status"),
    "clf",
    Some(json!({ "status": "approved", "reviewed_by_classifier": true })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::OK);
  let reviewed = json_body(resp).await;
  assert!(reviewed["approved_at"].is_string());

  let resp = send(&state, "GET", "/links", "cli", None).await;
  let listed = json_body(resp).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let resp = send(&state, "DELETE", &format!("/links/{id}"), "clf", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let resp = send(&state, "DELETE", &format!("/links/{id}"), "press", None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

// ── Organizations and reports ────────────────────────────────────────────────

#[tokio::test]
async fn report_lifecycle_composes_exports_and_logs() {
  let state = make_state().await;
  add_actor(&state, "root", Role::Administrator).await;
  add_actor(&state, "cli", Role::Client).await;

  let mut profile_ids = Vec::new();
  for (surname, role) in [("Gomez", "leader"), ("Perez", "hitman"), ("Diaz", "foot_soldier")] {
    let resp = send(
      &state,
      "POST",
      "/profiles",
      "root",
      Some(json!({ "surname": surname, "name": "X", "role": role })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    profile_ids.push(json_body(resp).await["profile_id"].clone());
  }

  let resp = send(
    &state,
    "POST",
    "/organizations",
    "root",
    Some(json!({
      "names": ["Los Halcones", "Halcones"],
      "zones": [zone("Rosario")],
      "member_ids": profile_ids,
    })),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let org_id = json_body(resp).await["organization_id"].as_str().unwrap().to_owned();

  let resp = send(&state, "GET", "/organizations", "cli", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let draft = json!({ "introduction": "Founded in 2015." });
  let resp = send(&state, "POST", &format!("/organizations/{org_id}/report"), "root", Some(draft.clone())).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let report = json_body(resp).await;
  let report_id = report["report_id"].as_str().unwrap().to_owned();
  let hierarchy = report["hierarchy"].as_array().unwrap();
  assert_eq!(hierarchy.iter().filter(|m| m["role"] == "leader").count(), 1);
  assert_eq!(hierarchy.iter().filter(|m| m["role"] == "lieutenant").count(), 2);

  let resp = send(&state, "POST", &format!("/organizations/{org_id}/report"), "root", Some(draft)).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(json_body(resp).await["report_id"], json!(report_id));

  let uri  = format!("/reports/{report_id}/sections");
  let resp = send(&state, "GET", &uri, "root", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let etag = resp.headers()[header::ETAG].to_str().unwrap().to_owned();
  let composed = json_body(resp).await;
  assert_eq!(composed["sections"].as_array().unwrap().len(), 7);
  assert_eq!(composed["sections"][1]["lines"][0], "Founded in 2015.");

  let resp = call(&state, "GET", &uri, Some("root"), vec![(header::IF_NONE_MATCH, etag.as_str())], None).await;
  assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

  let resp = send(&state, "POST", &format!("/reports/{report_id}/export"), "root", None).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()["x-export-count"], "1");
  let text = text_body(resp).await;
  assert!(text.starts_with("Organization report: Los Halcones"), "{text}");
  assert!(text.contains("Section 7 - Individual profile sheets"));

  let resp = send(&state, "GET", "/activity", "root", None).await;
  let entries = json_body(resp).await;
  assert_eq!(entries[0]["kind"], "report_export");

  let resp = send(&state, "GET", "/activity", "cli", None).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = send(&state, "DELETE", &format!("/organizations/{org_id}"), "root", None).await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);
  let resp = send(&state, "GET", &format!("/reports/{report_id}"), "root", None).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_a_report_for_an_unknown_organization_is_not_found() {
  let state = make_state().await;
  add_actor(&state, "ed", Role::Editor).await;
  let missing = uuid::Uuid::new_v4();
  let resp = send(&state, "POST", &format!("/organizations/{missing}/report"), "ed", Some(json!({}))).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
