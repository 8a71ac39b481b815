//! Handlers for `/organizations` endpoints.
//!
//! Organizations are all-or-nothing: a role either works with every
//! organization or sees none, so there is no per-record scope check.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/organizations` | `?name`, `zone`, `ally`, `rival`; ordered by principal name |
//! | `POST`   | `/organizations` | Body: [`NewOrganization`] |
//! | `GET`    | `/organizations/{id}` | |
//! | `PUT`    | `/organizations/{id}` | Outgoing relations only |
//! | `DELETE` | `/organizations/{id}` | Also deletes its report |
//! | `POST`   | `/organizations/{id}/report` | Body: [`ReportDraft`]; create or re-derive |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use casebook_core::{
  access::{Action, RecordKind},
  activity::ActivityKind,
  organization::{CriminalOrganization, NewOrganization, OrganizationQuery},
  report::ReportDraft,
  store::CaseStore,
};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentActor, require},
  error::ApiError,
};

const KIND: RecordKind = RecordKind::Organization;

/// `GET /organizations[?name=...][&zone=...][&ally=...][&rival=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(query): Query<OrganizationQuery>,
) -> Result<Json<Vec<CriminalOrganization>>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  let orgs = state.store.list_organizations(&query).await.map_err(ApiError::store)?;
  Ok(Json(orgs))
}

/// `GET /organizations/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<CriminalOrganization>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  state
    .store
    .get_organization(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("organization {id} not found")))
}

/// `POST /organizations`: returns 201 + the stored organization.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewOrganization>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Create, None)?;
  let org = state.store.create_organization(body).await.map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Create, KIND, org.organization_id).await;
  Ok((StatusCode::CREATED, Json(org)))
}

/// `PUT /organizations/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<NewOrganization>,
) -> Result<Json<CriminalOrganization>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Update, None)?;
  let org = state.store.update_organization(id, body).await.map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Update, KIND, id).await;
  Ok(Json(org))
}

/// `DELETE /organizations/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Delete, None)?;
  if !state.store.delete_organization(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("organization {id} not found")));
  }
  state.record_activity(&actor, ActivityKind::Delete, KIND, id).await;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// `POST /organizations/{id}/report`
///
/// Saves the organization's report and rebuilds its hierarchy under the
/// configured lieutenant policy. Returns 201 on first save, 200 afterwards.
pub async fn save_report<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(draft): Json<ReportDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, RecordKind::Report, Action::Update, None)?;
  let existing = state
    .store
    .report_for_organization(id)
    .await
    .map_err(ApiError::store)?;
  let (activity, status) = match existing {
    Some(_) => (ActivityKind::Update, StatusCode::OK),
    None => (ActivityKind::Create, StatusCode::CREATED),
  };

  let report = state
    .store
    .save_report(id, draft, Some(actor.actor_id), state.fallback)
    .await
    .map_err(ApiError::store)?;
  state
    .record_activity(&actor, activity, RecordKind::Report, report.report_id)
    .await;
  Ok((status, Json(report)))
}
