//! Handlers for `/links` endpoints: news-source submissions and their review.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/links` | Press officers see their own; consumers see approved only |
//! | `POST`   | `/links` | Body: [`NewLink`]; starts pending |
//! | `GET`    | `/links/{id}` | |
//! | `DELETE` | `/links/{id}` | |
//! | `POST`   | `/links/{id}/status` | Body: [`LinkReview`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use casebook_core::{
  access::{Action, RecordKind},
  activity::ActivityKind,
  link::{LinkRecord, LinkReview, NewLink},
  store::CaseStore,
};
use uuid::Uuid;

use crate::{
  AppState, ListParams,
  auth::{CurrentActor, require, require_visible},
  error::ApiError,
};

const KIND: RecordKind = RecordKind::Link;

async fn load<S: CaseStore>(state: &AppState<S>, id: Uuid) -> Result<LinkRecord, ApiError> {
  state
    .store
    .get_link(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("link {id} not found")))
}

/// `GET /links[?q=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<LinkRecord>>, ApiError>
where
  S: CaseStore + 'static,
{
  let query = params.scoped(&actor, KIND);
  Ok(Json(state.store.list_links(&query).await.map_err(ApiError::store)?))
}

/// `GET /links/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<LinkRecord>, ApiError>
where
  S: CaseStore + 'static,
{
  let link = load(&state, id).await?;
  require_visible(&actor, KIND, &link)?;
  Ok(Json(link))
}

/// `POST /links`: returns 201 + the pending link.
pub async fn submit<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewLink>,
) -> Result<impl IntoResponse, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Create, None)?;
  let link = state
    .store
    .submit_link(body, actor.actor_id)
    .await
    .map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::Create, KIND, link.link_id).await;
  Ok((StatusCode::CREATED, Json(link)))
}

/// `POST /links/{id}/status`
pub async fn review<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(review): Json<LinkReview>,
) -> Result<Json<LinkRecord>, ApiError>
where
  S: CaseStore + 'static,
{
  let existing = load(&state, id).await?;
  require_visible(&actor, KIND, &existing)?;
  require(&actor, KIND, Action::Update, Some(existing.owner))?;

  let status = review.status;
  let link = state.store.review_link(id, review).await.map_err(ApiError::store)?;
  tracing::info!(link_id = %id, %status, actor_id = %actor.actor_id, "link reviewed");
  state.record_activity(&actor, ActivityKind::StatusChange, KIND, id).await;
  Ok(Json(link))
}

/// `DELETE /links/{id}`
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
  require(&actor, KIND, Action::Delete, Some(existing.owner))?;

  if !state.store.delete_link(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("link {id} not found")));
  }
  state.record_activity(&actor, ActivityKind::Delete, KIND, id).await;
  Ok(StatusCode::NO_CONTENT)
}
