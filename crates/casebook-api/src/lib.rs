//! JSON REST API for Casebook.
//!
//! Exposes an axum [`Router`] backed by any [`casebook_core::store::CaseStore`].
//! Callers are resolved from HTTP Basic credentials; TLS and listening are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", casebook_api::api_router(state))
//! ```

pub mod actors;
pub mod activity;
pub mod auth;
pub mod error;
pub mod etag;
pub mod incidents;
pub mod links;
pub mod organizations;
pub mod profiles;
pub mod reports;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use casebook_core::{
  access::{self, RecordKind, RecordQuery},
  activity::{ActivityKind, NewActivity},
  actor::Actor,
  report::LieutenantFallback,
  store::CaseStore,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

pub use auth::CurrentActor;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:    Arc<S>,
  /// Lieutenant policy applied whenever a report is saved.
  pub fallback: LieutenantFallback,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), fallback: self.fallback }
  }
}

impl<S: CaseStore> AppState<S> {
  pub fn new(store: Arc<S>, fallback: LieutenantFallback) -> Self { Self { store, fallback } }

  /// Append an activity entry for a completed write. The write has already
  /// happened, so a failure here is logged and swallowed.
  pub(crate) async fn record_activity(
    &self,
    actor: &Actor,
    kind: ActivityKind,
    record: RecordKind,
    id: Uuid,
  ) {
    let entry = NewActivity::record(Some(actor.actor_id), kind, record, id);
    if let Err(e) = self.store.log_activity(entry).await {
      tracing::warn!(error = %e, %record, %id, "failed to record activity");
    }
  }
}

/// Paging and text filter shared by the record listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  /// Case-insensitive substring over the record's main text fields.
  pub q:      Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl ListParams {
  /// The listing query for `kind`, already narrowed to what `actor` may see.
  pub fn scoped(self, actor: &Actor, kind: RecordKind) -> RecordQuery {
    let base = RecordQuery {
      text: self.q,
      limit: self.limit,
      offset: self.offset,
      ..RecordQuery::default()
    };
    access::visible_scope(actor, kind, base)
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: CaseStore + 'static,
{
  Router::new()
    // Actors
    .route("/me", get(actors::me::<S>))
    .route("/actors", post(actors::create::<S>))
    // Profiles
    .route("/profiles", get(profiles::list::<S>).post(profiles::create::<S>))
    .route(
      "/profiles/{id}",
      get(profiles::get_one::<S>)
        .put(profiles::update::<S>)
        .delete(profiles::delete_one::<S>),
    )
    // Organizations
    .route(
      "/organizations",
      get(organizations::list::<S>).post(organizations::create::<S>),
    )
    .route(
      "/organizations/{id}",
      get(organizations::get_one::<S>)
        .put(organizations::update::<S>)
        .delete(organizations::delete_one::<S>),
    )
    .route("/organizations/{id}/report", post(organizations::save_report::<S>))
    // Incidents
    .route("/incidents", get(incidents::list::<S>).post(incidents::create::<S>))
    .route(
      "/incidents/{id}",
      get(incidents::get_one::<S>)
        .put(incidents::update::<S>)
        .delete(incidents::delete_one::<S>),
    )
    // Links
    .route("/links", get(links::list::<S>).post(links::submit::<S>))
    .route("/links/{id}", get(links::get_one::<S>).delete(links::delete_one::<S>))
    .route("/links/{id}/status", post(links::review::<S>))
    // Reports
    .route("/reports", get(reports::list::<S>))
    .route("/reports/{id}", get(reports::get_one::<S>).delete(reports::delete_one::<S>))
    .route("/reports/{id}/sections", get(reports::sections::<S>))
    .route("/reports/{id}/export", post(reports::export::<S>))
    // Activity
    .route("/activity", get(activity::list::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
