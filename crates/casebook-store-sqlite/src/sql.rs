//! Synchronous queries, run on the connection thread inside
//! `tokio_rusqlite::Connection::call`.
//!
//! Functions taking `&Connection` also accept a `&Transaction`, so callers
//! decide the transaction boundary.

use std::collections::HashMap;

use casebook_core::{
  access::{RecordKind, Scope},
  activity::ActivityEntry,
  actor::Actor,
  attrs,
  compose::{IncidentDetail, ReportContext},
  incident::CriminalIncident,
  link::LinkRecord,
  organization::{CriminalOrganization, OrganizationQuery, OrganizationRoster},
  profile::IndividualProfile,
  report::{
    HierarchyRole, LieutenantFallback, OrganizationReport, ReportDraft, derive_hierarchy,
  },
  store::ActorCredentials,
};
use chrono::{DateTime, Utc};
use rusqlite::{
  Connection, OptionalExtension as _, Row, functions::FunctionFlags, params, params_from_iter,
};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    RawActivity, RawActor, RawIncident, RawLink, RawMembership, RawOrganization, RawProfile,
    RawReport, encode_date, encode_dt, encode_uuid,
  },
};

/// Whether a write creates a row or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write {
  Insert,
  Update,
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// A join table linking one record to an ordered list of others.
pub struct Relation {
  table: &'static str,
  owner: &'static str,
  other: &'static str,
}

pub const ORGANIZATION_LEADERS: Relation =
  Relation { table: "organization_leaders", owner: "organization_id", other: "profile_id" };
pub const ORGANIZATION_MEMBERS: Relation =
  Relation { table: "organization_members", owner: "organization_id", other: "profile_id" };
pub const ORGANIZATION_ALLIES: Relation =
  Relation { table: "organization_allies", owner: "organization_id", other: "other_id" };
pub const ORGANIZATION_RIVALS: Relation =
  Relation { table: "organization_rivals", owner: "organization_id", other: "other_id" };
pub const INCIDENT_AUTHORS: Relation =
  Relation { table: "incident_authors", owner: "incident_id", other: "profile_id" };
pub const INCIDENT_ORGANIZATIONS: Relation =
  Relation { table: "incident_organizations", owner: "incident_id", other: "organization_id" };
pub const INCIDENT_LINKS: Relation =
  Relation { table: "incident_links", owner: "incident_id", other: "link_id" };
pub const REPORT_ALLIES: Relation =
  Relation { table: "report_allies", owner: "report_id", other: "organization_id" };
pub const REPORT_RIVALS: Relation =
  Relation { table: "report_rivals", owner: "report_id", other: "organization_id" };

impl Relation {
  pub fn load(&self, conn: &Connection, owner_id: &str) -> rusqlite::Result<Vec<String>> {
    let sql = format!(
      "SELECT {} FROM {} WHERE {} = ?1 ORDER BY position",
      self.other, self.table, self.owner
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let ids = stmt
      .query_map(params![owner_id], |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
  }

  /// Delete every row for `owner_id` and insert `ids` in order.
  pub fn replace(&self, conn: &Connection, owner_id: Uuid, ids: &[Uuid]) -> rusqlite::Result<()> {
    let owner_id = encode_uuid(owner_id);
    conn.execute(
      &format!("DELETE FROM {} WHERE {} = ?1", self.table, self.owner),
      params![owner_id],
    )?;
    let sql = format!(
      "INSERT INTO {} ({}, {}, position) VALUES (?1, ?2, ?3)",
      self.table, self.owner, self.other
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    for (position, id) in ids.iter().enumerate() {
      stmt.execute(params![owner_id, encode_uuid(*id), position as i64])?;
    }
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Register `casefold(text)`, a Unicode-aware lowercase. SQLite's own
/// `lower()` and `LIKE` only fold ASCII.
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "casefold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| {
      let text: Option<String> = ctx.get(0)?;
      Ok(text.map(|t| t.to_lowercase()))
    },
  )
}

/// Dynamic WHERE clause with positional parameters.
#[derive(Default)]
struct Filter {
  clauses: Vec<String>,
  args:    Vec<String>,
}

impl Filter {
  /// Translate a visibility scope. `None` when the scope admits nothing.
  fn scoped(scope: &Scope, owner_column: &str, finalized_clause: Option<&str>) -> Option<Self> {
    if scope.deny_all {
      return None;
    }
    let mut filter = Filter::default();
    if let Some(owner) = scope.owner {
      filter.bind(&format!("{owner_column} = $"), encode_uuid(owner));
    }
    if scope.finalized_only
      && let Some(clause) = finalized_clause
    {
      filter.clauses.push(clause.to_owned());
    }
    Some(filter)
  }

  /// Add a clause; every `$` in it binds the same new parameter.
  fn bind(&mut self, clause: &str, arg: String) {
    self.args.push(arg);
    let placeholder = format!("?{}", self.args.len());
    self.clauses.push(clause.replace('$', &placeholder));
  }

  /// Case-insensitive substring match over several columns.
  fn text(&mut self, columns: &[&str], text: Option<&str>) {
    let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
      return;
    };
    let any = columns
      .iter()
      .map(|c| format!("casefold({c}) LIKE $ ESCAPE '\\'"))
      .collect::<Vec<_>>()
      .join(" OR ");
    self.bind(&format!("({any})"), like_pattern(&text.to_lowercase()));
  }

  fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }
}

fn like_pattern(text: &str) -> String {
  let escaped = text
    .replace('\\', "\\\\")
    .replace('%', "\\%")
    .replace('_', "\\_");
  format!("%{escaped}%")
}

/// SQLite takes signed 64-bit bounds; larger values saturate.
fn page(limit: Option<usize>, offset: Option<usize>) -> String {
  let clamp = |n: usize| i64::try_from(n).unwrap_or(i64::MAX);
  let limit = limit.map_or(-1, clamp);
  format!("LIMIT {limit} OFFSET {}", offset.map_or(0, clamp))
}

fn query_all<T>(
  conn: &Connection,
  sql: &str,
  args: &[String],
  map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params_from_iter(args), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn delete_row(conn: &Connection, table: &str, column: &str, id: Uuid) -> Result<bool> {
  let n = conn.execute(
    &format!("DELETE FROM {table} WHERE {column} = ?1"),
    params![encode_uuid(id)],
  )?;
  Ok(n > 0)
}

/// Fail with a validation error on `field` if any of `ids` has no row.
pub fn require_existing(
  conn: &Connection,
  kind: RecordKind,
  field: &str,
  ids: &[Uuid],
) -> Result<()> {
  let (table, column) = match kind {
    RecordKind::Profile => ("profiles", "profile_id"),
    RecordKind::Organization => ("organizations", "organization_id"),
    RecordKind::Link => ("links", "link_id"),
    RecordKind::Incident => ("incidents", "incident_id"),
    RecordKind::Report => ("reports", "report_id"),
    RecordKind::Activity => ("activity", "entry_id"),
  };
  let mut stmt = conn.prepare_cached(&format!("SELECT 1 FROM {table} WHERE {column} = ?1"))?;
  for id in ids {
    if !stmt.exists(params![encode_uuid(*id)])? {
      return Err(casebook_core::Error::invalid(field, format!("unknown {kind} {id}")).into());
    }
  }
  Ok(())
}

fn not_found(kind: RecordKind, id: Uuid) -> crate::Error {
  casebook_core::Error::NotFound { kind, id }.into()
}

// ─── Actors ──────────────────────────────────────────────────────────────────

pub fn insert_actor(conn: &Connection, actor: &Actor, role: &str, password_hash: &str) -> Result<()> {
  let taken = conn
    .prepare_cached("SELECT 1 FROM actors WHERE username = ?1")?
    .exists(params![actor.username])?;
  if taken {
    return Err(casebook_core::Error::invalid("username", "is already taken").into());
  }
  conn.execute(
    "INSERT INTO actors (actor_id, username, role, password_hash, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(actor.actor_id),
      actor.username,
      role,
      password_hash,
      encode_dt(actor.created_at),
    ],
  )?;
  Ok(())
}

pub fn select_actor(conn: &Connection, id: Uuid) -> Result<Option<Actor>> {
  let sql = format!("SELECT {} FROM actors WHERE actor_id = ?1", RawActor::COLUMNS);
  let raw = conn
    .query_row(&sql, params![encode_uuid(id)], RawActor::from_row)
    .optional()?;
  raw.map(RawActor::into_actor).transpose()
}

pub fn select_credentials(conn: &Connection, username: &str) -> Result<Option<ActorCredentials>> {
  let sql = format!("SELECT {} FROM actors WHERE username = ?1", RawActor::COLUMNS);
  let Some(raw) = conn
    .query_row(&sql, params![username], RawActor::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  let password_hash = raw.password_hash.clone();
  Ok(Some(ActorCredentials { actor: raw.into_actor()?, password_hash }))
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Fail with a validation error if another profile holds the same non-empty
/// document number.
pub fn check_document(conn: &Connection, profile: &IndividualProfile) -> Result<()> {
  if profile.document.is_empty() {
    return Ok(());
  }
  let taken = conn
    .prepare_cached("SELECT 1 FROM profiles WHERE document = ?1 AND profile_id <> ?2")?
    .exists(params![profile.document, encode_uuid(profile.profile_id)])?;
  if taken {
    return Err(
      casebook_core::Error::invalid("document", "another profile already uses this document number")
        .into(),
    );
  }
  Ok(())
}

pub fn write_profile(conn: &Connection, p: &IndividualProfile, write: Write) -> Result<()> {
  let sql = match write {
    Write::Insert => format!(
      "INSERT INTO profiles ({}) VALUES
       (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
      RawProfile::COLUMNS
    ),
    Write::Update => "UPDATE profiles SET
       surname = ?2, name = ?3, document = ?4, tax_id = ?5, nationality = ?6, role = ?7,
       custody = ?8, occupation = ?9, birth_date = ?10, aliases = ?11, phones = ?12,
       addresses = ?13, vehicles = ?14, employers = ?15, owner = ?16,
       created_at = ?17, updated_at = ?18
     WHERE profile_id = ?1"
      .to_owned(),
  };
  conn.execute(&sql, params![
    encode_uuid(p.profile_id),
    p.surname,
    p.name,
    p.document,
    p.tax_id,
    p.nationality,
    p.role.map(|r| r.to_string()),
    p.custody.map(|c| c.to_string()),
    p.occupation,
    p.birth_date.map(encode_date),
    attrs::encode(&p.aliases)?,
    attrs::encode(&p.phones)?,
    attrs::encode(&p.addresses)?,
    attrs::encode(&p.vehicles)?,
    attrs::encode(&p.employers)?,
    p.owner.map(encode_uuid),
    encode_dt(p.created_at),
    encode_dt(p.updated_at),
  ])?;
  Ok(())
}

pub fn select_profile(conn: &Connection, id: Uuid) -> Result<Option<IndividualProfile>> {
  let sql = format!("SELECT {} FROM profiles WHERE profile_id = ?1", RawProfile::COLUMNS);
  let raw = conn
    .query_row(&sql, params![encode_uuid(id)], RawProfile::from_row)
    .optional()?;
  raw.map(RawProfile::into_profile).transpose()
}

/// Profiles for `ids` in the given order; unknown ids are skipped.
pub fn select_profiles_by_id(conn: &Connection, ids: &[Uuid]) -> Result<Vec<IndividualProfile>> {
  let mut out = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(p) = select_profile(conn, *id)? {
      out.push(p);
    }
  }
  Ok(out)
}

pub fn select_profiles(
  conn: &Connection,
  query: &casebook_core::access::RecordQuery,
) -> Result<Vec<IndividualProfile>> {
  let Some(mut filter) = Filter::scoped(&query.scope, "owner", None) else {
    return Ok(Vec::new());
  };
  filter.text(&["surname", "name", "document", "aliases"], query.text.as_deref());
  let sql = format!(
    "SELECT {} FROM profiles {} ORDER BY surname COLLATE NOCASE, name COLLATE NOCASE {}",
    RawProfile::COLUMNS,
    filter.where_clause(),
    page(query.limit, query.offset),
  );
  query_all(conn, &sql, &filter.args, RawProfile::from_row)?
    .into_iter()
    .map(RawProfile::into_profile)
    .collect()
}

// ─── Organizations ───────────────────────────────────────────────────────────

pub fn write_organization(conn: &Connection, o: &CriminalOrganization, write: Write) -> Result<()> {
  let sql = match write {
    Write::Insert => {
      "INSERT INTO organizations (organization_id, names, zones, created_at, updated_at)
       VALUES (?1, ?2, ?3, ?4, ?5)"
    }
    Write::Update => {
      "UPDATE organizations SET names = ?2, zones = ?3, created_at = ?4, updated_at = ?5
       WHERE organization_id = ?1"
    }
  };
  conn.execute(sql, params![
    encode_uuid(o.organization_id),
    attrs::encode(&o.names)?,
    attrs::encode(&o.zones)?,
    encode_dt(o.created_at),
    encode_dt(o.updated_at),
  ])?;
  ORGANIZATION_LEADERS.replace(conn, o.organization_id, &o.leader_ids)?;
  ORGANIZATION_MEMBERS.replace(conn, o.organization_id, &o.member_ids)?;
  ORGANIZATION_ALLIES.replace(conn, o.organization_id, &o.ally_ids)?;
  ORGANIZATION_RIVALS.replace(conn, o.organization_id, &o.rival_ids)?;
  Ok(())
}

fn load_organization_relations(conn: &Connection, raw: &mut RawOrganization) -> rusqlite::Result<()> {
  raw.leader_ids = ORGANIZATION_LEADERS.load(conn, &raw.organization_id)?;
  raw.member_ids = ORGANIZATION_MEMBERS.load(conn, &raw.organization_id)?;
  raw.ally_ids = ORGANIZATION_ALLIES.load(conn, &raw.organization_id)?;
  raw.rival_ids = ORGANIZATION_RIVALS.load(conn, &raw.organization_id)?;
  Ok(())
}

pub fn select_organization(conn: &Connection, id: Uuid) -> Result<Option<CriminalOrganization>> {
  let sql = format!(
    "SELECT {} FROM organizations WHERE organization_id = ?1",
    RawOrganization::COLUMNS
  );
  let Some(mut raw) = conn
    .query_row(&sql, params![encode_uuid(id)], RawOrganization::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  load_organization_relations(conn, &mut raw)?;
  raw.into_organization().map(Some)
}

/// Organizations for `ids` in the given order; unknown ids are skipped.
pub fn select_organizations_by_id(
  conn: &Connection,
  ids: &[Uuid],
) -> Result<Vec<CriminalOrganization>> {
  let mut out = Vec::with_capacity(ids.len());
  for id in ids {
    if let Some(o) = select_organization(conn, *id)? {
      out.push(o);
    }
  }
  Ok(out)
}

/// Organizations matching `query`, ordered by principal name.
pub fn select_organizations(
  conn: &Connection,
  query: &OrganizationQuery,
) -> Result<Vec<CriminalOrganization>> {
  let sql = format!("SELECT {} FROM organizations", RawOrganization::COLUMNS);
  let mut raws = query_all(conn, &sql, &[], RawOrganization::from_row)?;
  for raw in &mut raws {
    load_organization_relations(conn, raw)?;
  }
  let all = raws
    .into_iter()
    .map(RawOrganization::into_organization)
    .collect::<Result<Vec<_>>>()?;

  let by_id: HashMap<Uuid, &CriminalOrganization> =
    all.iter().map(|o| (o.organization_id, o)).collect();
  let mut hits: Vec<CriminalOrganization> = all
    .iter()
    .filter(|o| query.matches(o, |id| by_id.get(&id).copied()))
    .cloned()
    .collect();
  hits.sort_by_cached_key(|o| o.principal_name().to_lowercase());
  Ok(hits)
}

pub fn select_roster(conn: &Connection, id: Uuid) -> Result<Option<OrganizationRoster>> {
  let Some(organization) = select_organization(conn, id)? else {
    return Ok(None);
  };
  let leaders = select_profiles_by_id(conn, &organization.leader_ids)?;
  let members = select_profiles_by_id(conn, &organization.member_ids)?;
  Ok(Some(OrganizationRoster { organization, leaders, members }))
}

// ─── Incidents ───────────────────────────────────────────────────────────────

pub fn write_incident(conn: &Connection, i: &CriminalIncident, write: Write) -> Result<()> {
  let sql = match write {
    Write::Insert => format!(
      "INSERT INTO incidents ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
      RawIncident::COLUMNS
    ),
    Write::Update => "UPDATE incidents SET
       date = ?2, category = ?3, location = ?4, qualification = ?5, description = ?6,
       author_unknown = ?7, created_by = ?8, created_at = ?9
     WHERE incident_id = ?1"
      .to_owned(),
  };
  conn.execute(&sql, params![
    encode_uuid(i.incident_id),
    encode_date(i.date),
    i.category.map(|c| c.to_string()),
    i.location.encode()?,
    i.qualification.to_string(),
    i.description,
    i.author_unknown,
    i.created_by.map(encode_uuid),
    encode_dt(i.created_at),
  ])?;
  INCIDENT_AUTHORS.replace(conn, i.incident_id, &i.author_ids)?;
  INCIDENT_ORGANIZATIONS.replace(conn, i.incident_id, &i.organization_ids)?;
  INCIDENT_LINKS.replace(conn, i.incident_id, &i.link_ids)?;
  Ok(())
}

fn load_incident_relations(conn: &Connection, raw: &mut RawIncident) -> rusqlite::Result<()> {
  raw.author_ids = INCIDENT_AUTHORS.load(conn, &raw.incident_id)?;
  raw.organization_ids = INCIDENT_ORGANIZATIONS.load(conn, &raw.incident_id)?;
  raw.link_ids = INCIDENT_LINKS.load(conn, &raw.incident_id)?;
  Ok(())
}

fn finish_incidents(conn: &Connection, mut raws: Vec<RawIncident>) -> Result<Vec<CriminalIncident>> {
  for raw in &mut raws {
    load_incident_relations(conn, raw)?;
  }
  raws.into_iter().map(RawIncident::into_incident).collect()
}

pub fn select_incident(conn: &Connection, id: Uuid) -> Result<Option<CriminalIncident>> {
  let sql = format!("SELECT {} FROM incidents WHERE incident_id = ?1", RawIncident::COLUMNS);
  let Some(mut raw) = conn
    .query_row(&sql, params![encode_uuid(id)], RawIncident::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  load_incident_relations(conn, &mut raw)?;
  raw.into_incident().map(Some)
}

pub fn select_incidents(
  conn: &Connection,
  query: &casebook_core::access::RecordQuery,
) -> Result<Vec<CriminalIncident>> {
  let Some(mut filter) = Filter::scoped(&query.scope, "created_by", None) else {
    return Ok(Vec::new());
  };
  filter.text(&["description", "location"], query.text.as_deref());
  let sql = format!(
    "SELECT {} FROM incidents {} ORDER BY date DESC, created_at DESC {}",
    RawIncident::COLUMNS,
    filter.where_clause(),
    page(query.limit, query.offset),
  );
  let raws = query_all(conn, &sql, &filter.args, RawIncident::from_row)?;
  finish_incidents(conn, raws)
}

/// Incidents linked to an organization, newest first.
pub fn select_incidents_for_organization(
  conn: &Connection,
  organization_id: Uuid,
) -> Result<Vec<CriminalIncident>> {
  let columns = RawIncident::COLUMNS
    .split(", ")
    .map(|c| format!("i.{}", c.trim()))
    .collect::<Vec<_>>()
    .join(", ");
  let sql = format!(
    "SELECT {columns} FROM incidents i
     JOIN incident_organizations io ON io.incident_id = i.incident_id
     WHERE io.organization_id = ?1
     ORDER BY i.date DESC, i.created_at DESC"
  );
  let raws = query_all(conn, &sql, &[encode_uuid(organization_id)], RawIncident::from_row)?;
  finish_incidents(conn, raws)
}

// ─── Links ───────────────────────────────────────────────────────────────────

/// Fail with a validation error if another link has the same URL.
pub fn check_url(conn: &Connection, link: &LinkRecord) -> Result<()> {
  let taken = conn
    .prepare_cached("SELECT 1 FROM links WHERE url = ?1 AND link_id <> ?2")?
    .exists(params![link.url, encode_uuid(link.link_id)])?;
  if taken {
    return Err(casebook_core::Error::invalid("url", "this link was already submitted").into());
  }
  Ok(())
}

pub fn write_link(conn: &Connection, l: &LinkRecord, write: Write) -> Result<()> {
  let sql = match write {
    Write::Insert => format!(
      "INSERT INTO links ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      RawLink::COLUMNS
    ),
    Write::Update => "UPDATE links SET
       url = ?2, outlet = ?3, status = ?4, approved_at = ?5, categories = ?6,
       reviewed_by_classifier = ?7, reviewed_by_editor = ?8, owner = ?9, submitted_at = ?10
     WHERE link_id = ?1"
      .to_owned(),
  };
  conn.execute(&sql, params![
    encode_uuid(l.link_id),
    l.url,
    l.outlet,
    l.status.to_string(),
    l.approved_at.map(encode_dt),
    attrs::encode(&l.categories)?,
    l.reviewed_by_classifier,
    l.reviewed_by_editor,
    encode_uuid(l.owner),
    encode_dt(l.submitted_at),
  ])?;
  Ok(())
}

pub fn select_link(conn: &Connection, id: Uuid) -> Result<Option<LinkRecord>> {
  let sql = format!("SELECT {} FROM links WHERE link_id = ?1", RawLink::COLUMNS);
  let raw = conn
    .query_row(&sql, params![encode_uuid(id)], RawLink::from_row)
    .optional()?;
  raw.map(RawLink::into_link).transpose()
}

pub fn select_links(
  conn: &Connection,
  query: &casebook_core::access::RecordQuery,
) -> Result<Vec<LinkRecord>> {
  let Some(mut filter) = Filter::scoped(&query.scope, "owner", Some("status = 'approved'")) else {
    return Ok(Vec::new());
  };
  filter.text(&["url", "outlet", "categories"], query.text.as_deref());
  let sql = format!(
    "SELECT {} FROM links {} ORDER BY submitted_at DESC {}",
    RawLink::COLUMNS,
    filter.where_clause(),
    page(query.limit, query.offset),
  );
  query_all(conn, &sql, &filter.args, RawLink::from_row)?
    .into_iter()
    .map(RawLink::into_link)
    .collect()
}

// ─── Reports ─────────────────────────────────────────────────────────────────

fn load_report_relations(conn: &Connection, raw: &mut RawReport) -> rusqlite::Result<()> {
  raw.ally_ids = REPORT_ALLIES.load(conn, &raw.report_id)?;
  raw.rival_ids = REPORT_RIVALS.load(conn, &raw.report_id)?;
  let mut stmt = conn.prepare_cached(
    "SELECT member_id, role FROM memberships WHERE report_id = ?1 ORDER BY position",
  )?;
  raw.memberships = stmt
    .query_map(params![raw.report_id], |row| {
      Ok(RawMembership { member_id: row.get(0)?, role: row.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(())
}

fn select_report_where(
  conn: &Connection,
  column: &str,
  id: Uuid,
) -> Result<Option<OrganizationReport>> {
  let sql = format!("SELECT {} FROM reports WHERE {column} = ?1", RawReport::COLUMNS);
  let Some(mut raw) = conn
    .query_row(&sql, params![encode_uuid(id)], RawReport::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  load_report_relations(conn, &mut raw)?;
  raw.into_report().map(Some)
}

pub fn select_report(conn: &Connection, id: Uuid) -> Result<Option<OrganizationReport>> {
  select_report_where(conn, "report_id", id)
}

pub fn select_report_for_organization(
  conn: &Connection,
  organization_id: Uuid,
) -> Result<Option<OrganizationReport>> {
  select_report_where(conn, "organization_id", organization_id)
}

pub fn select_reports(conn: &Connection) -> Result<Vec<OrganizationReport>> {
  let sql = format!("SELECT {} FROM reports ORDER BY updated_at DESC", RawReport::COLUMNS);
  let mut raws = query_all(conn, &sql, &[], RawReport::from_row)?;
  for raw in &mut raws {
    load_report_relations(conn, raw)?;
  }
  raws.into_iter().map(RawReport::into_report).collect()
}

/// Upsert the report for `organization_id` and rebuild every derived part of
/// it. Runs in a single transaction; nothing is written if any step fails.
pub fn save_report(
  conn: &mut Connection,
  organization_id: Uuid,
  draft: &ReportDraft,
  created_by: Option<Uuid>,
  fallback: LieutenantFallback,
  now: DateTime<Utc>,
) -> Result<OrganizationReport> {
  let tx = conn.transaction()?;

  let roster = select_roster(&tx, organization_id)?
    .ok_or_else(|| not_found(RecordKind::Organization, organization_id))?;
  let organization = &roster.organization;

  let existing: Option<String> = tx
    .query_row(
      "SELECT report_id FROM reports WHERE organization_id = ?1",
      params![encode_uuid(organization_id)],
      |row| row.get(0),
    )
    .optional()?;
  let report_id = match existing.as_deref() {
    Some(id) => crate::encode::decode_uuid(id)?,
    None => Uuid::new_v4(),
  };

  let report_key = encode_uuid(report_id);
  let organization_key = encode_uuid(organization_id);
  let antecedents = attrs::encode(&draft.antecedents)?;
  let zones = attrs::encode(&organization.zones)?;
  let author = created_by.map(encode_uuid);
  let stamp = encode_dt(now);
  let fields = params![
    report_key,
    organization_key,
    draft.introduction,
    draft.relevant_conclusion,
    draft.likely_evolution,
    draft.development_title,
    draft.development_body,
    draft.conclusions,
    antecedents,
    zones,
    author,
    stamp,
  ];
  if existing.is_some() {
    tx.execute(
      "UPDATE reports SET
         introduction = ?3, relevant_conclusion = ?4, likely_evolution = ?5,
         development_title = ?6, development_body = ?7, conclusions = ?8,
         antecedents = ?9, zones = ?10, created_by = COALESCE(created_by, ?11),
         updated_at = ?12
       WHERE report_id = ?1 AND organization_id = ?2",
      fields,
    )?;
  } else {
    tx.execute(
      "INSERT INTO reports (
         report_id, organization_id, introduction, relevant_conclusion, likely_evolution,
         development_title, development_body, conclusions, antecedents, zones,
         export_count, created_by, created_at, updated_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11, ?12, ?12)",
      fields,
    )?;
  }

  REPORT_ALLIES.replace(&tx, report_id, &organization.ally_ids)?;
  REPORT_RIVALS.replace(&tx, report_id, &organization.rival_ids)?;

  tx.execute("DELETE FROM memberships WHERE report_id = ?1", params![report_key])?;
  let records = derive_hierarchy(&roster, fallback).into_records(report_id);
  {
    let mut stmt = tx.prepare_cached(
      "INSERT INTO memberships (report_id, member_id, role, position) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (position, record) in records.iter().enumerate() {
      stmt.execute(params![
        encode_uuid(record.report_id),
        encode_uuid(record.member_id),
        record.role.as_ref(),
        position as i64,
      ])?;
    }
  }

  let report = select_report(&tx, report_id)?.ok_or_else(|| not_found(RecordKind::Report, report_id))?;
  tx.commit()?;
  Ok(report)
}

/// Increment the export counter; `None` if the report does not exist.
pub fn increment_export(conn: &Connection, id: Uuid) -> Result<Option<u32>> {
  let key = encode_uuid(id);
  let updated = conn.execute(
    "UPDATE reports SET export_count = export_count + 1 WHERE report_id = ?1",
    params![key],
  )?;
  if updated == 0 {
    return Ok(None);
  }
  let count: i64 = conn.query_row(
    "SELECT export_count FROM reports WHERE report_id = ?1",
    params![key],
    |row| row.get(0),
  )?;
  Ok(Some(u32::try_from(count).unwrap_or(u32::MAX)))
}

pub fn select_context(conn: &Connection, id: Uuid) -> Result<Option<ReportContext>> {
  let Some(report) = select_report(conn, id)? else {
    return Ok(None);
  };
  let organization = select_organization(conn, report.organization_id)?
    .ok_or_else(|| not_found(RecordKind::Organization, report.organization_id))?;

  let leaders = select_profiles_by_id(conn, &report.member_ids(HierarchyRole::Leader))?;
  let lieutenants = select_profiles_by_id(conn, &report.member_ids(HierarchyRole::Lieutenant))?;
  let members = select_profiles_by_id(conn, &organization.member_ids)?;
  let allies = select_organizations_by_id(conn, &report.ally_ids)?;
  let rivals = select_organizations_by_id(conn, &report.rival_ids)?;

  let mut incidents = Vec::new();
  for incident in select_incidents_for_organization(conn, organization.organization_id)? {
    let authors = select_profiles_by_id(conn, &incident.author_ids)?;
    incidents.push(IncidentDetail { incident, authors });
  }

  Ok(Some(ReportContext {
    report,
    organization,
    leaders,
    lieutenants,
    members,
    allies,
    rivals,
    incidents,
  }))
}

// ─── Activity ────────────────────────────────────────────────────────────────

pub fn insert_activity(conn: &Connection, entry: &ActivityEntry) -> Result<()> {
  conn.execute(
    "INSERT INTO activity (entry_id, actor_id, kind, description, at)
     VALUES (?1, ?2, ?3, ?4, ?5)",
    params![
      encode_uuid(entry.entry_id),
      entry.actor_id.map(encode_uuid),
      entry.kind.as_ref(),
      entry.description,
      encode_dt(entry.at),
    ],
  )?;
  Ok(())
}

pub fn select_activity(conn: &Connection, limit: usize) -> Result<Vec<ActivityEntry>> {
  let sql = format!(
    "SELECT {} FROM activity ORDER BY at DESC, rowid DESC {}",
    RawActivity::COLUMNS,
    page(Some(limit), None)
  );
  query_all(conn, &sql, &[], RawActivity::from_row)?
    .into_iter()
    .map(RawActivity::into_entry)
    .collect()
}
