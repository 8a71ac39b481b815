//! Handlers for `/reports` endpoints.
//!
//! Reports are saved through `POST /organizations/{id}/report`; these routes
//! read, compose, export and delete them.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/reports` | Most recently updated first |
//! | `GET`    | `/reports/{id}` | |
//! | `DELETE` | `/reports/{id}` | |
//! | `GET`    | `/reports/{id}/sections` | Composed sections; `ETag` / `If-None-Match` |
//! | `POST`   | `/reports/{id}/export` | Plain-text document; bumps the export counter |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, HeaderName, StatusCode, header},
  response::{IntoResponse, Response},
};
use casebook_core::{
  access::{Action, RecordKind},
  activity::ActivityKind,
  compose::{self, ReportContext, Section},
  report::OrganizationReport,
  store::CaseStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{CurrentActor, require},
  error::ApiError,
  etag::{compute_etag, not_modified},
};

const KIND: RecordKind = RecordKind::Report;

/// Response body of `GET /reports/{id}/sections`.
#[derive(Debug, Serialize)]
pub struct ComposedReport {
  pub report_id:       Uuid,
  pub organization_id: Uuid,
  pub title:           String,
  pub sections:        Vec<Section>,
}

fn title(ctx: &ReportContext) -> String {
  format!("Organization report: {}", ctx.organization.display_name())
}

async fn load_context<S: CaseStore>(
  state: &AppState<S>,
  id: Uuid,
) -> Result<ReportContext, ApiError> {
  state
    .store
    .report_context(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))
}

/// `GET /reports`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<OrganizationReport>>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  Ok(Json(state.store.list_reports().await.map_err(ApiError::store)?))
}

/// `GET /reports/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<OrganizationReport>, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  state
    .store
    .get_report(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("report {id} not found")))
}

/// `DELETE /reports/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::Delete, None)?;
  if !state.store.delete_report(id).await.map_err(ApiError::store)? {
    return Err(ApiError::NotFound(format!("report {id} not found")));
  }
  state.record_activity(&actor, ActivityKind::Delete, KIND, id).await;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /reports/{id}/sections`
///
/// Returns 304 with no body when `If-None-Match` carries the current ETag.
pub async fn sections<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  let ctx      = load_context(&state, id).await?;
  let sections = compose::compose(&ctx);
  let etag     = compute_etag(&sections);

  if not_modified(&headers, &etag) {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  let body = ComposedReport {
    report_id:       ctx.report.report_id,
    organization_id: ctx.organization.organization_id,
    title:           title(&ctx),
    sections,
  };
  Ok((StatusCode::OK, [(header::ETAG, etag)], Json(body)).into_response())
}

/// `POST /reports/{id}/export`
///
/// Composes the report, renders it as plain text and records the export.
/// The new export count is returned in `x-export-count`.
pub async fn export<S>(
  State(state): State<AppState<S>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: CaseStore + 'static,
{
  require(&actor, KIND, Action::View, None)?;
  let ctx  = load_context(&state, id).await?;
  let text = compose::render_text(&title(&ctx), &compose::compose(&ctx));

  let count = state.store.record_export(id).await.map_err(ApiError::store)?;
  state.record_activity(&actor, ActivityKind::ReportExport, KIND, id).await;
  tracing::info!(report_id = %id, export_count = count, "report exported");

  Ok(
    (
      StatusCode::OK,
      [
        (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
        (
          header::CONTENT_DISPOSITION,
          format!("attachment; filename=\"report-{id}.txt\""),
        ),
        (HeaderName::from_static("x-export-count"), count.to_string()),
      ],
      text,
    )
      .into_response(),
  )
}
