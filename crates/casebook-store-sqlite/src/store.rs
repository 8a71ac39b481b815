//! [`SqliteStore`], the SQLite implementation of [`CaseStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use casebook_core::{
  access::{RecordKind, RecordQuery},
  activity::{ActivityEntry, NewActivity},
  actor::Actor,
  attrs::normalize_all,
  compose::ReportContext,
  incident::{CriminalIncident, NewIncident},
  link::{LinkRecord, LinkReview, LinkStatus, NewLink},
  organization::{CriminalOrganization, NewOrganization, OrganizationQuery, OrganizationRoster},
  profile::{IndividualProfile, NewProfile},
  report::{LieutenantFallback, OrganizationReport, ReportDraft},
  store::{ActorCredentials, CaseStore, NewActor},
};

use crate::{
  Error, Result,
  schema::SCHEMA,
  sql::{self, Write},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A case record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        sql::register_functions(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the connection thread. Domain errors raised inside `f` come
  /// back unchanged; a transaction opened by `f` rolls back when it fails.
  pub(crate) async fn with_conn<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

fn not_found(kind: RecordKind, id: Uuid) -> Error {
  casebook_core::Error::NotFound { kind, id }.into()
}

fn build_profile(
  input: NewProfile,
  profile_id: Uuid,
  owner: Option<Uuid>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
) -> IndividualProfile {
  IndividualProfile {
    profile_id,
    surname: input.surname,
    name: input.name,
    document: input.document,
    tax_id: input.tax_id,
    nationality: input.nationality,
    role: input.role,
    custody: input.custody,
    occupation: input.occupation,
    birth_date: input.birth_date,
    aliases: input.aliases,
    phones: input.phones,
    addresses: input.addresses,
    vehicles: input.vehicles,
    employers: input.employers,
    owner,
    created_at,
    updated_at,
  }
}

fn build_organization(
  input: NewOrganization,
  organization_id: Uuid,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
) -> CriminalOrganization {
  CriminalOrganization {
    organization_id,
    names: input.names,
    zones: input.zones,
    leader_ids: input.leader_ids,
    member_ids: input.member_ids,
    ally_ids: input.ally_ids,
    rival_ids: input.rival_ids,
    created_at,
    updated_at,
  }
}

fn build_incident(
  input: NewIncident,
  incident_id: Uuid,
  created_by: Option<Uuid>,
  created_at: DateTime<Utc>,
) -> CriminalIncident {
  CriminalIncident {
    incident_id,
    date: input.date,
    category: input.category,
    location: input.location,
    qualification: input.qualification,
    description: input.description,
    author_ids: input.author_ids,
    author_unknown: input.author_unknown,
    organization_ids: input.organization_ids,
    link_ids: input.link_ids,
    created_by,
    created_at,
  }
}

fn check_organization_refs(conn: &rusqlite::Connection, o: &CriminalOrganization) -> Result<()> {
  sql::require_existing(conn, RecordKind::Profile, "leader_ids", &o.leader_ids)?;
  sql::require_existing(conn, RecordKind::Profile, "member_ids", &o.member_ids)?;
  sql::require_existing(conn, RecordKind::Organization, "ally_ids", &o.ally_ids)?;
  sql::require_existing(conn, RecordKind::Organization, "rival_ids", &o.rival_ids)?;
  Ok(())
}

fn check_incident_refs(conn: &rusqlite::Connection, i: &CriminalIncident) -> Result<()> {
  sql::require_existing(conn, RecordKind::Profile, "author_ids", &i.author_ids)?;
  sql::require_existing(conn, RecordKind::Organization, "organization_ids", &i.organization_ids)?;
  sql::require_existing(conn, RecordKind::Link, "link_ids", &i.link_ids)?;
  Ok(())
}

// ─── CaseStore impl ──────────────────────────────────────────────────────────

impl CaseStore for SqliteStore {
  type Error = Error;

  // ── Actors ────────────────────────────────────────────────────────────────

  async fn add_actor(&self, input: NewActor) -> Result<Actor> {
    let username = input.username.trim().to_owned();
    if username.is_empty() {
      return Err(casebook_core::Error::invalid("username", "is required").into());
    }
    let actor = Actor {
      actor_id: Uuid::new_v4(),
      username,
      role: Some(input.role),
      created_at: Utc::now(),
    };
    let role = input.role.to_string();
    let hash = input.password_hash;

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        sql::insert_actor(&tx, &actor, &role, &hash)?;
        tx.commit()?;
        Ok(actor)
      })
      .await
  }

  async fn get_actor(&self, id: Uuid) -> Result<Option<Actor>> {
    self.with_conn(move |conn| sql::select_actor(conn, id)).await
  }

  async fn find_credentials(&self, username: &str) -> Result<Option<ActorCredentials>> {
    let username = username.to_owned();
    self
      .with_conn(move |conn| sql::select_credentials(conn, &username))
      .await
  }

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_profile(
    &self,
    input: NewProfile,
    owner: Option<Uuid>,
  ) -> Result<IndividualProfile> {
    let now = Utc::now();
    let profile = build_profile(input.normalized()?, Uuid::new_v4(), owner, now, now);

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        sql::check_document(&tx, &profile)?;
        sql::write_profile(&tx, &profile, Write::Insert)?;
        tx.commit()?;
        Ok(profile)
      })
      .await
  }

  async fn update_profile(&self, id: Uuid, input: NewProfile) -> Result<IndividualProfile> {
    let input = input.normalized()?;

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let existing =
          sql::select_profile(&tx, id)?.ok_or_else(|| not_found(RecordKind::Profile, id))?;
        let profile = build_profile(input, id, existing.owner, existing.created_at, Utc::now());
        sql::check_document(&tx, &profile)?;
        sql::write_profile(&tx, &profile, Write::Update)?;
        tx.commit()?;
        Ok(profile)
      })
      .await
  }

  async fn get_profile(&self, id: Uuid) -> Result<Option<IndividualProfile>> {
    self.with_conn(move |conn| sql::select_profile(conn, id)).await
  }

  async fn list_profiles(&self, query: &RecordQuery) -> Result<Vec<IndividualProfile>> {
    let query = query.clone();
    self
      .with_conn(move |conn| sql::select_profiles(conn, &query))
      .await
  }

  async fn delete_profile(&self, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| sql::delete_row(conn, "profiles", "profile_id", id))
      .await
  }

  // ── Organizations ─────────────────────────────────────────────────────────

  async fn create_organization(&self, input: NewOrganization) -> Result<CriminalOrganization> {
    let now = Utc::now();
    let organization = build_organization(input.validated(None)?, Uuid::new_v4(), now, now);

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        check_organization_refs(&tx, &organization)?;
        sql::write_organization(&tx, &organization, Write::Insert)?;
        tx.commit()?;
        Ok(organization)
      })
      .await
  }

  async fn update_organization(
    &self,
    id: Uuid,
    input: NewOrganization,
  ) -> Result<CriminalOrganization> {
    let input = input.validated(Some(id))?;

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let existing = sql::select_organization(&tx, id)?
          .ok_or_else(|| not_found(RecordKind::Organization, id))?;
        let organization = build_organization(input, id, existing.created_at, Utc::now());
        check_organization_refs(&tx, &organization)?;
        sql::write_organization(&tx, &organization, Write::Update)?;
        tx.commit()?;
        Ok(organization)
      })
      .await
  }

  async fn get_organization(&self, id: Uuid) -> Result<Option<CriminalOrganization>> {
    self
      .with_conn(move |conn| sql::select_organization(conn, id))
      .await
  }

  async fn list_organizations(
    &self,
    query: &OrganizationQuery,
  ) -> Result<Vec<CriminalOrganization>> {
    let query = query.clone();
    self
      .with_conn(move |conn| sql::select_organizations(conn, &query))
      .await
  }

  async fn delete_organization(&self, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| sql::delete_row(conn, "organizations", "organization_id", id))
      .await
  }

  async fn organization_roster(&self, id: Uuid) -> Result<Option<OrganizationRoster>> {
    self.with_conn(move |conn| sql::select_roster(conn, id)).await
  }

  // ── Incidents ─────────────────────────────────────────────────────────────

  async fn create_incident(
    &self,
    input: NewIncident,
    created_by: Option<Uuid>,
  ) -> Result<CriminalIncident> {
    let incident = build_incident(input.normalized()?, Uuid::new_v4(), created_by, Utc::now());

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        check_incident_refs(&tx, &incident)?;
        sql::write_incident(&tx, &incident, Write::Insert)?;
        tx.commit()?;
        Ok(incident)
      })
      .await
  }

  async fn update_incident(&self, id: Uuid, input: NewIncident) -> Result<CriminalIncident> {
    let input = input.normalized()?;

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let existing =
          sql::select_incident(&tx, id)?.ok_or_else(|| not_found(RecordKind::Incident, id))?;
        let incident = build_incident(input, id, existing.created_by, existing.created_at);
        check_incident_refs(&tx, &incident)?;
        sql::write_incident(&tx, &incident, Write::Update)?;
        tx.commit()?;
        Ok(incident)
      })
      .await
  }

  async fn get_incident(&self, id: Uuid) -> Result<Option<CriminalIncident>> {
    self.with_conn(move |conn| sql::select_incident(conn, id)).await
  }

  async fn list_incidents(&self, query: &RecordQuery) -> Result<Vec<CriminalIncident>> {
    let query = query.clone();
    self
      .with_conn(move |conn| sql::select_incidents(conn, &query))
      .await
  }

  async fn delete_incident(&self, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| sql::delete_row(conn, "incidents", "incident_id", id))
      .await
  }

  // ── Links ─────────────────────────────────────────────────────────────────

  async fn submit_link(&self, input: NewLink, owner: Uuid) -> Result<LinkRecord> {
    let input = input.normalized()?;
    let link = LinkRecord {
      link_id: Uuid::new_v4(),
      url: input.url,
      outlet: input.outlet,
      status: LinkStatus::Pending,
      approved_at: None,
      categories: input.categories,
      reviewed_by_classifier: false,
      reviewed_by_editor: false,
      owner,
      submitted_at: Utc::now(),
    };

    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        sql::check_url(&tx, &link)?;
        sql::write_link(&tx, &link, Write::Insert)?;
        tx.commit()?;
        Ok(link)
      })
      .await
  }

  async fn review_link(&self, id: Uuid, review: LinkReview) -> Result<LinkRecord> {
    self
      .with_conn(move |conn| {
        let tx = conn.transaction()?;
        let mut link =
          sql::select_link(&tx, id)?.ok_or_else(|| not_found(RecordKind::Link, id))?;
        link.set_status(review.status, Utc::now());
        if let Some(categories) = review.categories {
          link.categories = normalize_all(categories);
        }
        if let Some(flag) = review.reviewed_by_classifier {
          link.reviewed_by_classifier = flag;
        }
        if let Some(flag) = review.reviewed_by_editor {
          link.reviewed_by_editor = flag;
        }
        sql::write_link(&tx, &link, Write::Update)?;
        tx.commit()?;
        Ok(link)
      })
      .await
  }

  async fn get_link(&self, id: Uuid) -> Result<Option<LinkRecord>> {
    self.with_conn(move |conn| sql::select_link(conn, id)).await
  }

  async fn list_links(&self, query: &RecordQuery) -> Result<Vec<LinkRecord>> {
    let query = query.clone();
    self.with_conn(move |conn| sql::select_links(conn, &query)).await
  }

  async fn delete_link(&self, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| sql::delete_row(conn, "links", "link_id", id))
      .await
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn save_report(
    &self,
    organization_id: Uuid,
    draft: ReportDraft,
    created_by: Option<Uuid>,
    fallback: LieutenantFallback,
  ) -> Result<OrganizationReport> {
    let draft = draft.normalized();
    let now = Utc::now();

    let report = self
      .with_conn(move |conn| {
        sql::save_report(conn, organization_id, &draft, created_by, fallback, now)
      })
      .await?;

    tracing::debug!(
      report_id = %report.report_id,
      %organization_id,
      memberships = report.hierarchy.len(),
      "report saved; hierarchy re-derived"
    );
    Ok(report)
  }

  async fn get_report(&self, id: Uuid) -> Result<Option<OrganizationReport>> {
    self.with_conn(move |conn| sql::select_report(conn, id)).await
  }

  async fn report_for_organization(
    &self,
    organization_id: Uuid,
  ) -> Result<Option<OrganizationReport>> {
    self
      .with_conn(move |conn| sql::select_report_for_organization(conn, organization_id))
      .await
  }

  async fn list_reports(&self) -> Result<Vec<OrganizationReport>> {
    self.with_conn(|conn| sql::select_reports(conn)).await
  }

  async fn delete_report(&self, id: Uuid) -> Result<bool> {
    self
      .with_conn(move |conn| sql::delete_row(conn, "reports", "report_id", id))
      .await
  }

  async fn report_context(&self, id: Uuid) -> Result<Option<ReportContext>> {
    self.with_conn(move |conn| sql::select_context(conn, id)).await
  }

  async fn record_export(&self, id: Uuid) -> Result<u32> {
    self
      .with_conn(move |conn| sql::increment_export(conn, id))
      .await?
      .ok_or_else(|| not_found(RecordKind::Report, id))
  }

  // ── Activity ──────────────────────────────────────────────────────────────

  async fn log_activity(&self, entry: NewActivity) -> Result<ActivityEntry> {
    let entry = ActivityEntry {
      entry_id:    Uuid::new_v4(),
      actor_id:    entry.actor_id,
      kind:        entry.kind,
      description: entry.description,
      at:          Utc::now(),
    };
    self
      .with_conn(move |conn| {
        sql::insert_activity(conn, &entry)?;
        Ok(entry)
      })
      .await
  }

  async fn list_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>> {
    self
      .with_conn(move |conn| sql::select_activity(conn, limit))
      .await
  }
}
