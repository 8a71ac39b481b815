//! The `CaseStore` trait and supporting types.
//!
//! The trait is implemented by storage backends (e.g.
//! `casebook-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Stores do not make access decisions. Listing methods take a query whose
//! scope has already been narrowed with
//! [`visible_scope`](crate::access::visible_scope); the store only translates
//! that scope into its own filter.

use std::future::Future;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  access::RecordQuery,
  activity::{ActivityEntry, NewActivity},
  actor::{Actor, Role},
  compose::ReportContext,
  incident::{CriminalIncident, NewIncident},
  link::{LinkRecord, LinkReview, NewLink},
  organization::{CriminalOrganization, NewOrganization, OrganizationQuery, OrganizationRoster},
  profile::{IndividualProfile, NewProfile},
  report::{LieutenantFallback, OrganizationReport, ReportDraft},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types so callers can recover the domain error
/// (validation, not-found, access-denied) a backend failure may carry.
pub trait BackendError: std::error::Error + Send + Sync + 'static {
  /// The embedded domain error, if this failure is one.
  fn core(&self) -> Option<&crate::Error>;
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NewActor {
  pub username:      String,
  pub role:          Role,
  /// Argon2 PHC string.
  pub password_hash: String,
}

/// An actor together with the stored password hash, for authentication only.
#[derive(Debug, Clone)]
pub struct ActorCredentials {
  pub actor:         Actor,
  pub password_hash: String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a case record store backend.
///
/// Write methods normalise and validate their input themselves, so the
/// invariants on documents, names and zones hold whatever the caller.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait CaseStore: Send + Sync {
  type Error: BackendError;

  // ── Actors ────────────────────────────────────────────────────────────

  /// Fails with a validation error when the username is taken.
  fn add_actor(
    &self,
    input: NewActor,
  ) -> impl Future<Output = Result<Actor, Self::Error>> + Send + '_;

  fn get_actor(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Actor>, Self::Error>> + Send + '_;

  fn find_credentials<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<ActorCredentials>, Self::Error>> + Send + 'a;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Fails with a validation error when a non-empty document number is
  /// already used by another profile.
  fn create_profile(
    &self,
    input: NewProfile,
    owner: Option<Uuid>,
  ) -> impl Future<Output = Result<IndividualProfile, Self::Error>> + Send + '_;

  /// Replace every editable field. Ownership is unchanged.
  fn update_profile(
    &self,
    id: Uuid,
    input: NewProfile,
  ) -> impl Future<Output = Result<IndividualProfile, Self::Error>> + Send + '_;

  fn get_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<IndividualProfile>, Self::Error>> + Send + '_;

  /// Profiles inside `query.scope`, ordered by surname then name.
  fn list_profiles<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<IndividualProfile>, Self::Error>> + Send + 'a;

  /// Returns `false` if nothing was deleted.
  fn delete_profile(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Organizations ─────────────────────────────────────────────────────

  fn create_organization(
    &self,
    input: NewOrganization,
  ) -> impl Future<Output = Result<CriminalOrganization, Self::Error>> + Send + '_;

  /// Replace names, zones, membership and outgoing relations. Incoming
  /// relations from other organizations are left alone.
  fn update_organization(
    &self,
    id: Uuid,
    input: NewOrganization,
  ) -> impl Future<Output = Result<CriminalOrganization, Self::Error>> + Send + '_;

  fn get_organization(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CriminalOrganization>, Self::Error>> + Send + '_;

  /// Organizations matching `query`, ordered by principal name.
  fn list_organizations<'a>(
    &'a self,
    query: &'a OrganizationQuery,
  ) -> impl Future<Output = Result<Vec<CriminalOrganization>, Self::Error>> + Send + 'a;

  /// Deleting an organization also deletes its report.
  fn delete_organization(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The organization with its leader and member profiles resolved.
  fn organization_roster(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<OrganizationRoster>, Self::Error>> + Send + '_;

  // ── Incidents ─────────────────────────────────────────────────────────

  fn create_incident(
    &self,
    input: NewIncident,
    created_by: Option<Uuid>,
  ) -> impl Future<Output = Result<CriminalIncident, Self::Error>> + Send + '_;

  fn update_incident(
    &self,
    id: Uuid,
    input: NewIncident,
  ) -> impl Future<Output = Result<CriminalIncident, Self::Error>> + Send + '_;

  fn get_incident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CriminalIncident>, Self::Error>> + Send + '_;

  /// Incidents inside `query.scope`, newest first.
  fn list_incidents<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<CriminalIncident>, Self::Error>> + Send + 'a;

  fn delete_incident(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Links ─────────────────────────────────────────────────────────────

  /// New links start pending. Fails with a validation error on a duplicate
  /// URL.
  fn submit_link(
    &self,
    input: NewLink,
    owner: Uuid,
  ) -> impl Future<Output = Result<LinkRecord, Self::Error>> + Send + '_;

  /// Apply a review decision; see [`LinkRecord::set_status`].
  fn review_link(
    &self,
    id: Uuid,
    review: LinkReview,
  ) -> impl Future<Output = Result<LinkRecord, Self::Error>> + Send + '_;

  fn get_link(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<LinkRecord>, Self::Error>> + Send + '_;

  /// Links inside `query.scope`, newest first.
  fn list_links<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<LinkRecord>, Self::Error>> + Send + 'a;

  fn delete_link(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Create or update the report for `organization_id` in one transaction:
  /// store the draft, copy the organization's zones, replace the ally and
  /// rival snapshots, and delete and re-derive the membership hierarchy.
  ///
  /// `created_by` is recorded on first save only.
  fn save_report(
    &self,
    organization_id: Uuid,
    draft: ReportDraft,
    created_by: Option<Uuid>,
    fallback: LieutenantFallback,
  ) -> impl Future<Output = Result<OrganizationReport, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<OrganizationReport>, Self::Error>> + Send + '_;

  fn report_for_organization(
    &self,
    organization_id: Uuid,
  ) -> impl Future<Output = Result<Option<OrganizationReport>, Self::Error>> + Send + '_;

  /// All reports, most recently updated first.
  fn list_reports(
    &self,
  ) -> impl Future<Output = Result<Vec<OrganizationReport>, Self::Error>> + Send + '_;

  fn delete_report(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Everything [`compose`](crate::compose::compose) needs for one report.
  fn report_context(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ReportContext>, Self::Error>> + Send + '_;

  /// Increment the export counter and return the new count.
  fn record_export(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<u32, Self::Error>> + Send + '_;

  // ── Activity ──────────────────────────────────────────────────────────

  fn log_activity(
    &self,
    entry: NewActivity,
  ) -> impl Future<Output = Result<ActivityEntry, Self::Error>> + Send + '_;

  /// The latest `limit` entries, newest first.
  fn list_activity(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ActivityEntry>, Self::Error>> + Send + '_;
}
