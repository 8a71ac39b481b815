//! Handlers for `/me` and `/actors`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/me` | The authenticated actor |
//! | `POST` | `/actors` | Administrator only; body: [`NewActorBody`] |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use casebook_core::{
  Error,
  activity::{ActivityKind, NewActivity},
  actor::{Actor, Role},
  store::{CaseStore, NewActor},
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{CurrentActor, hash_password},
  error::ApiError,
};

/// `GET /me`
pub async fn me<S>(CurrentActor(actor): CurrentActor) -> Json<Actor>
where
  S: CaseStore + 'static,
{
  Json(actor)
}

#[derive(Debug, Deserialize)]
pub struct NewActorBody {
  pub username: String,
  pub role:     Role,
  pub password: String,
}

/// `POST /actors`: returns 201 + the stored actor. The password is hashed
/// here and never stored in clear.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewActorBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  if !actor.has_role(Role::Administrator) {
    tracing::warn!(actor_id = %actor.actor_id, "actor creation denied");
    return Err(ApiError::Forbidden);
  }

  let username = body.username.trim().to_owned();
  if username.is_empty() || username.contains(':') {
    return Err(Error::invalid("username", "must be non-empty and contain no ':'").into());
  }
  if body.password.is_empty() {
    return Err(Error::invalid("password", "must not be empty").into());
  }
  let password_hash =
    hash_password(&body.password).map_err(|e| ApiError::Store(e.to_string().into()))?;

  let created = state
    .store
    .add_actor(NewActor { username, role: body.role, password_hash })
    .await
    .map_err(ApiError::store)?;

  tracing::info!(actor_id = %created.actor_id, role = %body.role, "actor created");
  let entry = NewActivity {
    actor_id:    Some(actor.actor_id),
    kind:        ActivityKind::Create,
    description: format!("create actor {}", created.username),
  };
  if let Err(e) = state.store.log_activity(entry).await {
    tracing::warn!(error = %e, "failed to record activity");
  }
  Ok((StatusCode::CREATED, Json(created)))
}
