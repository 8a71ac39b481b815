//! Handler for `GET /activity`.

use axum::{
  Json,
  extract::{Query, State},
};
use casebook_core::{
  access::{Action, RecordKind},
  activity::ActivityEntry,
  store::CaseStore,
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{CurrentActor, require},
  error::ApiError,
};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
  pub limit: Option<usize>,
}

/// `GET /activity[?limit=...]`: the latest entries, newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, RecordKind::Activity, Action::View, None)?;
  let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
  Ok(Json(state.store.list_activity(limit).await.map_err(ApiError::store)?))
}
