//! Handlers for `/incidents` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/incidents` | `?q`, `limit`, `offset`; newest first |
//! | `POST`   | `/incidents` | Body: [`NewIncident`]; caller is recorded as creator |
//! | `GET`    | `/incidents/{id}` | |
//! | `PUT`    | `/incidents/{id}` | Editors may only edit their own |
//! | `DELETE` | `/incidents/{id}` | |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use casebook_core::{
  access::{Action, RecordKind, Scoped},
  activity::ActivityKind,
  incident::{CriminalIncident, NewIncident},
  store::CaseStore,
};
use uuid::Uuid;

use crate::{
  AppState, ListParams,
  auth::{CurrentActor, require, require_visible},
  error::ApiError,
};

const KIND: RecordKind = RecordKind::Incident;

async fn load<S: CaseStore>(state: &AppState<S>, id: Uuid) -> Result<CriminalIncident, ApiError> {
  state
    .store
    .get_incident(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("incident {id} not found")))
}

/// `GET /incidents[?q=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CriminalIncident>>, ApiError>
where
  S: CaseStore + 'static,
{
  let query = params.scoped(&actor, KIND);
  let incidents = state.store.list_incidents(&query).await.map_err(ApiError::store)?;
  Ok(Json(incidents))
}

/// `GET /incidents/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<CriminalIncident>, ApiError>
where
  S: CaseStore + 'static,
{
  let incident = load(&state, id).await?;
  require_visible(&actor, KIND, &incident)?;
  Ok(Json(incident))
}

/// `POST /incidents`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewIncident>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Create, None)?;
  let incident = state
    .store
    .create_incident(body, Some(actor.actor_id))
    .await
    .map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Create, KIND, incident.incident_id).await;
  Ok((StatusCode::CREATED, Json(incident)))
}

/// `PUT /incidents/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewIncident>,
) -> Result<Json<CriminalIncident>, ApiError>
where
  S: CaseStore + 'static,
{
  let existing = load(&state, id).await?;
  require_visible(&actor, KIND, &existing)?;
  require(&actor, KIND, Action::Update, existing.owner())?;

  let incident = state.store.update_incident(id, body).await.map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Update, KIND, id).await;
  Ok(Json(incident))
}

/// `DELETE /incidents/{id}`
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

  if !state.store.delete_incident(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("incident {id} not found")));
  }
  state.record_activity(&actor, ActivityKind::Delete, KIND, id).await;
  Ok(StatusCode::NO_CONTENT)
}
