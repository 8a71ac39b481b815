//! Handlers for `/profiles` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/profiles` | `?q`, `limit`, `offset`; narrowed to the caller's scope |
//! | `POST`   | `/profiles` | Body: [`NewProfile`]; returns 201; caller becomes owner |
//! | `GET`    | `/profiles/{id}` | 403 outside the caller's scope |
//! | `PUT`    | `/profiles/{id}` | Replaces every editable field |
//! | `DELETE` | `/profiles/{id}` | 204 |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use casebook_core::{
  access::{Action, RecordKind, Scoped},
  activity::ActivityKind,
  profile::{IndividualProfile, NewProfile},
  store::CaseStore,
};
use uuid::Uuid;

use crate::{
  AppState, ListParams,
  auth::{CurrentActor, require, require_visible},
  error::ApiError,
};

const KIND: RecordKind = RecordKind::Profile;

async fn load<S: CaseStore>(state: &AppState<S>, id: Uuid) -> Result<IndividualProfile, ApiError> {
  state
    .store
    .get_profile(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))
}

/// `GET /profiles[?q=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<IndividualProfile>>, ApiError>
where
  S: CaseStore + 'static,
{
  let query = params.scoped(&actor, KIND);
  let profiles = state.store.list_profiles(&query).await.map_err(ApiError::store)?;
  Ok(Json(profiles))
}

/// `GET /profiles/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<IndividualProfile>, ApiError>
where
  S: CaseStore + 'static,
{
  let profile = load(&state, id).await?;
  require_visible(&actor, KIND, &profile)?;
  Ok(Json(profile))
}

/// `POST /profiles`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewProfile>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Create, None)?;
  let profile = state
    .store
    .create_profile(body, Some(actor.actor_id))
    .await
    .map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Create, KIND, profile.profile_id).await;
  Ok((StatusCode::CREATED, Json(profile)))
}

/// `PUT /profiles/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewProfile>,
) -> Result<Json<IndividualProfile>, ApiError>
where
  S: CaseStore + 'static,
{
  let existing = load(&state, id).await?;
  require_visible(&actor, KIND, &existing)?;
  require(&actor, KIND, Action::Update, existing.owner())?;

  let profile = state.store.update_profile(id, body).await.map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Update, KIND, id).await;
  Ok(Json(profile))
}

/// `DELETE /profiles/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
{
  let existing = load(&state, id).await?;
  require_visible(&actor, KIND, &existing)?;
  require(&actor, KIND, Action::Delete, existing.owner())?;

  if !state.store.delete_profile(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("profile {id} not found")));
  }
  state.record_activity(&actor, ActivityKind::Delete, KIND, id).await;
  Ok(StatusCode::NO_CONTENT)
}
