//! HTTP Basic-auth actor resolution and the role gates every handler passes
//! through.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use casebook_core::{
  access::{self, Action, RecordKind, RecordQuery, Scoped},
  actor::Actor,
  store::CaseStore,
};
use rand_core::OsRng;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

/// The authenticated caller. Handlers receive it explicitly and pass it into
/// every access decision.
pub struct CurrentActor(pub Actor);

/// Split a `Basic` authorization header into username and password.
pub fn basic_credentials(headers: &HeaderMap) -> Result<(String, String), ApiError> {
  let header_val = headers
    .get(axum::http::header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .ok_or(ApiError::Unauthorized)?;

  let encoded = header_val
    .strip_prefix("Basic ")
    .ok_or(ApiError::Unauthorized)?;

  let decoded = B64.decode(encoded).map_err(|_| ApiError::Unauthorized)?;
  let creds   = std::str::from_utf8(&decoded).map_err(|_| ApiError::Unauthorized)?;

  let (username, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok((username.to_owned(), password.to_owned()))
}

/// Check `password` against an argon2 PHC string.
pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Produce an argon2 PHC string for `password` with a fresh salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

impl<S> FromRequestParts<AppState<S>> for CurrentActor
where
  S: CaseStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let (username, password) = basic_credentials(&parts.headers)?;

    let creds = state
      .store
      .find_credentials(&username)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    if !verify_password(&password, &creds.password_hash) {
      tracing::debug!(%username, "rejected credentials");
      return Err(ApiError::Unauthorized);
    }
    Ok(CurrentActor(creds.actor))
  }
}

// ─── Gates ───────────────────────────────────────────────────────────────────

fn denied(actor: &Actor, kind: RecordKind, action: Action) -> ApiError {
  tracing::warn!(
    actor_id = %actor.actor_id,
    role = actor.role.map_or("<none>", <&'static str>::from),
    %kind,
    %action,
    "access denied",
  );
  ApiError::Forbidden
}

/// Role gate for an action on a record owned by `owner`.
pub fn require(
  actor: &Actor,
  kind: RecordKind,
  action: Action,
  owner: Option<Uuid>,
) -> Result<(), ApiError> {
  if access::permits(actor, kind, action, owner) {
    Ok(())
  } else {
    Err(denied(actor, kind, action))
  }
}

/// A single record may be viewed only when it falls inside the actor's scope.
pub fn require_visible<T: Scoped>(actor: &Actor, kind: RecordKind, record: &T) -> Result<(), ApiError> {
  let scope = access::visible_scope(actor, kind, RecordQuery::default()).scope;
  if scope.admits(record.owner(), record.is_finalized()) {
    Ok(())
  } else {
    Err(denied(actor, kind, Action::View))
  }
}
