//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings and calendar dates as
//! `YYYY-MM-DD`. UUIDs are stored as hyphenated lowercase strings.
//! Structured list attributes are decoded with the fail-soft codec from
//! `casebook_core::attrs`: malformed stored text yields an empty list, never
//! an error.

use casebook_core::{
  activity::{ActivityEntry, ActivityKind},
  actor::{Actor, Role},
  attrs::{self, Location},
  incident::{CriminalIncident, IncidentCategory, Qualification},
  link::{LinkRecord, LinkStatus},
  organization::CriminalOrganization,
  profile::{CustodyStatus, IndividualProfile, MemberRole},
  report::{HierarchyRole, MembershipRecord, OrganizationReport},
};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn decode_opt_uuid(s: Option<&str>) -> Result<Option<Uuid>> {
  s.map(decode_uuid).transpose()
}

/// Decode ids read from a join table.
pub fn decode_uuids(ids: &[String]) -> Result<Vec<Uuid>> {
  ids.iter().map(|s| decode_uuid(s)).collect()
}

// ─── Dates ───────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enumerations ────────────────────────────────────────────────────────────

/// Decode an optional enumeration column; unknown text is dropped with a
/// debug event rather than failing the whole row.
fn decode_opt_enum<T>(column: &str, text: Option<&str>, parse: fn(&str) -> Option<T>) -> Option<T> {
  let text = text?.trim();
  if text.is_empty() {
    return None;
  }
  let value = parse(text);
  if value.is_none() {
    tracing::debug!(column, value = text, "unknown stored value; treating as unset");
  }
  value
}

fn decode_bool(v: i64) -> bool { v != 0 }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from an `actors` row.
pub struct RawActor {
  pub actor_id:      String,
  pub username:      String,
  pub role:          String,
  pub password_hash: String,
  pub created_at:    String,
}

impl RawActor {
  pub const COLUMNS: &'static str = "actor_id, username, role, password_hash, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawActor {
      actor_id:      row.get(0)?,
      username:      row.get(1)?,
      role:          row.get(2)?,
      password_hash: row.get(3)?,
      created_at:    row.get(4)?,
    })
  }

  pub fn into_actor(self) -> Result<Actor> {
    Ok(Actor {
      actor_id:   decode_uuid(&self.actor_id)?,
      username:   self.username,
      role:       Role::parse_lossy(&self.role),
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:  String,
  pub surname:     String,
  pub name:        String,
  pub document:    String,
  pub tax_id:      Option<i64>,
  pub nationality: String,
  pub role:        Option<String>,
  pub custody:     Option<String>,
  pub occupation:  String,
  pub birth_date:  Option<String>,
  pub aliases:     Option<String>,
  pub phones:      Option<String>,
  pub addresses:   Option<String>,
  pub vehicles:    Option<String>,
  pub employers:   Option<String>,
  pub owner:       Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawProfile {
  pub const COLUMNS: &'static str = "profile_id, surname, name, document, tax_id, nationality, \
     role, custody, occupation, birth_date, aliases, phones, addresses, vehicles, employers, \
     owner, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawProfile {
      profile_id:  row.get(0)?,
      surname:     row.get(1)?,
      name:        row.get(2)?,
      document:    row.get(3)?,
      tax_id:      row.get(4)?,
      nationality: row.get(5)?,
      role:        row.get(6)?,
      custody:     row.get(7)?,
      occupation:  row.get(8)?,
      birth_date:  row.get(9)?,
      aliases:     row.get(10)?,
      phones:      row.get(11)?,
      addresses:   row.get(12)?,
      vehicles:    row.get(13)?,
      employers:   row.get(14)?,
      owner:       row.get(15)?,
      created_at:  row.get(16)?,
      updated_at:  row.get(17)?,
    })
  }

  pub fn into_profile(self) -> Result<IndividualProfile> {
    let birth_date = match self.birth_date.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(s) => Some(decode_date(s)?),
    };
    Ok(IndividualProfile {
      profile_id: decode_uuid(&self.profile_id)?,
      surname: self.surname,
      name: self.name,
      document: self.document,
      tax_id: self.tax_id,
      nationality: self.nationality,
      role: decode_opt_enum("profiles.role", self.role.as_deref(), MemberRole::parse_lossy),
      custody: decode_opt_enum(
        "profiles.custody",
        self.custody.as_deref(),
        CustodyStatus::parse_lossy,
      ),
      occupation: self.occupation,
      birth_date,
      aliases: attrs::decode_text(self.aliases.as_deref()),
      phones: attrs::decode_text(self.phones.as_deref()),
      addresses: attrs::decode_text(self.addresses.as_deref()),
      vehicles: attrs::decode_text(self.vehicles.as_deref()),
      employers: attrs::decode_text(self.employers.as_deref()),
      owner: decode_opt_uuid(self.owner.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values from an `organizations` row plus its join tables.
pub struct RawOrganization {
  pub organization_id: String,
  pub names:           Option<String>,
  pub zones:           Option<String>,
  pub created_at:      String,
  pub updated_at:      String,
  pub leader_ids:      Vec<String>,
  pub member_ids:      Vec<String>,
  pub ally_ids:        Vec<String>,
  pub rival_ids:       Vec<String>,
}

impl RawOrganization {
  pub const COLUMNS: &'static str = "organization_id, names, zones, created_at, updated_at";

  /// Read the row itself; relation lists are filled in by the caller.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawOrganization {
      organization_id: row.get(0)?,
      names:           row.get(1)?,
      zones:           row.get(2)?,
      created_at:      row.get(3)?,
      updated_at:      row.get(4)?,
      leader_ids:      Vec::new(),
      member_ids:      Vec::new(),
      ally_ids:        Vec::new(),
      rival_ids:       Vec::new(),
    })
  }

  pub fn into_organization(self) -> Result<CriminalOrganization> {
    Ok(CriminalOrganization {
      organization_id: decode_uuid(&self.organization_id)?,
      names:           attrs::decode_text(self.names.as_deref()),
      zones:           attrs::decode_text(self.zones.as_deref()),
      leader_ids:      decode_uuids(&self.leader_ids)?,
      member_ids:      decode_uuids(&self.member_ids)?,
      ally_ids:        decode_uuids(&self.ally_ids)?,
      rival_ids:       decode_uuids(&self.rival_ids)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values from an `incidents` row plus its join tables.
pub struct RawIncident {
  pub incident_id:      String,
  pub date:             String,
  pub category:         Option<String>,
  pub location:         Option<String>,
  pub qualification:    String,
  pub description:      String,
  pub author_unknown:   i64,
  pub created_by:       Option<String>,
  pub created_at:       String,
  pub author_ids:       Vec<String>,
  pub organization_ids: Vec<String>,
  pub link_ids:         Vec<String>,
}

impl RawIncident {
  pub const COLUMNS: &'static str = "incident_id, date, category, location, qualification, \
     description, author_unknown, created_by, created_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawIncident {
      incident_id:      row.get(0)?,
      date:             row.get(1)?,
      category:         row.get(2)?,
      location:         row.get(3)?,
      qualification:    row.get(4)?,
      description:      row.get(5)?,
      author_unknown:   row.get(6)?,
      created_by:       row.get(7)?,
      created_at:       row.get(8)?,
      author_ids:       Vec::new(),
      organization_ids: Vec::new(),
      link_ids:         Vec::new(),
    })
  }

  pub fn into_incident(self) -> Result<CriminalIncident> {
    Ok(CriminalIncident {
      incident_id:      decode_uuid(&self.incident_id)?,
      date:             decode_date(&self.date)?,
      category:         decode_opt_enum("incidents.category", self.category.as_deref(), |s| {
        s.parse::<IncidentCategory>().ok()
      }),
      location:         Location::decode_text(self.location.as_deref()),
      qualification:    decode_opt_enum(
        "incidents.qualification",
        Some(&self.qualification),
        |s| s.parse::<Qualification>().ok(),
      )
      .unwrap_or_default(),
      description:      self.description,
      author_ids:       decode_uuids(&self.author_ids)?,
      author_unknown:   decode_bool(self.author_unknown),
      organization_ids: decode_uuids(&self.organization_ids)?,
      link_ids:         decode_uuids(&self.link_ids)?,
      created_by:       decode_opt_uuid(self.created_by.as_deref())?,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `links` row.
pub struct RawLink {
  pub link_id:                String,
  pub url:                    String,
  pub outlet:                 Option<String>,
  pub status:                 String,
  pub approved_at:            Option<String>,
  pub categories:             Option<String>,
  pub reviewed_by_classifier: i64,
  pub reviewed_by_editor:     i64,
  pub owner:                  String,
  pub submitted_at:           String,
}

impl RawLink {
  pub const COLUMNS: &'static str = "link_id, url, outlet, status, approved_at, categories, \
     reviewed_by_classifier, reviewed_by_editor, owner, submitted_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawLink {
      link_id:                row.get(0)?,
      url:                    row.get(1)?,
      outlet:                 row.get(2)?,
      status:                 row.get(3)?,
      approved_at:            row.get(4)?,
      categories:             row.get(5)?,
      reviewed_by_classifier: row.get(6)?,
      reviewed_by_editor:     row.get(7)?,
      owner:                  row.get(8)?,
      submitted_at:           row.get(9)?,
    })
  }

  pub fn into_link(self) -> Result<LinkRecord> {
    Ok(LinkRecord {
      link_id:                decode_uuid(&self.link_id)?,
      url:                    self.url,
      outlet:                 self.outlet,
      status:                 decode_opt_enum("links.status", Some(&self.status), |s| {
        s.parse::<LinkStatus>().ok()
      })
      .unwrap_or_default(),
      approved_at:            self.approved_at.as_deref().map(decode_dt).transpose()?,
      categories:             attrs::decode_text(self.categories.as_deref()),
      reviewed_by_classifier: decode_bool(self.reviewed_by_classifier),
      reviewed_by_editor:     decode_bool(self.reviewed_by_editor),
      owner:                  decode_uuid(&self.owner)?,
      submitted_at:           decode_dt(&self.submitted_at)?,
    })
  }
}

/// Raw values from a `memberships` row.
pub struct RawMembership {
  pub member_id: String,
  pub role:      String,
}

/// Raw values from a `reports` row plus its snapshot and hierarchy tables.
pub struct RawReport {
  pub report_id:           String,
  pub organization_id:     String,
  pub introduction:        String,
  pub relevant_conclusion: String,
  pub likely_evolution:    String,
  pub development_title:   String,
  pub development_body:    String,
  pub conclusions:         String,
  pub antecedents:         Option<String>,
  pub zones:               Option<String>,
  pub export_count:        i64,
  pub created_by:          Option<String>,
  pub created_at:          String,
  pub updated_at:          String,
  pub ally_ids:            Vec<String>,
  pub rival_ids:           Vec<String>,
  pub memberships:         Vec<RawMembership>,
}

impl RawReport {
  pub const COLUMNS: &'static str = "report_id, organization_id, introduction, \
     relevant_conclusion, likely_evolution, development_title, development_body, conclusions, \
     antecedents, zones, export_count, created_by, created_at, updated_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawReport {
      report_id:           row.get(0)?,
      organization_id:     row.get(1)?,
      introduction:        row.get(2)?,
      relevant_conclusion: row.get(3)?,
      likely_evolution:    row.get(4)?,
      development_title:   row.get(5)?,
      development_body:    row.get(6)?,
      conclusions:         row.get(7)?,
      antecedents:         row.get(8)?,
      zones:               row.get(9)?,
      export_count:        row.get(10)?,
      created_by:          row.get(11)?,
      created_at:          row.get(12)?,
      updated_at:          row.get(13)?,
      ally_ids:            Vec::new(),
      rival_ids:           Vec::new(),
      memberships:         Vec::new(),
    })
  }

  pub fn into_report(self) -> Result<OrganizationReport> {
    let report_id = decode_uuid(&self.report_id)?;
    let mut hierarchy = Vec::with_capacity(self.memberships.len());
    for m in &self.memberships {
      let Some(role) = decode_opt_enum("memberships.role", Some(&m.role), |s| {
        s.parse::<HierarchyRole>().ok()
      }) else {
        continue;
      };
      hierarchy.push(MembershipRecord { report_id, member_id: decode_uuid(&m.member_id)?, role });
    }

    Ok(OrganizationReport {
      report_id,
      organization_id: decode_uuid(&self.organization_id)?,
      introduction: self.introduction,
      relevant_conclusion: self.relevant_conclusion,
      likely_evolution: self.likely_evolution,
      development_title: self.development_title,
      development_body: self.development_body,
      conclusions: self.conclusions,
      antecedents: attrs::decode_text(self.antecedents.as_deref()),
      zones: attrs::decode_text(self.zones.as_deref()),
      ally_ids: decode_uuids(&self.ally_ids)?,
      rival_ids: decode_uuids(&self.rival_ids)?,
      hierarchy,
      export_count: u32::try_from(self.export_count).unwrap_or(0),
      created_by: decode_opt_uuid(self.created_by.as_deref())?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `activity` row.
pub struct RawActivity {
  pub entry_id:    String,
  pub actor_id:    Option<String>,
  pub kind:        String,
  pub description: String,
  pub at:          String,
}

impl RawActivity {
  pub const COLUMNS: &'static str = "entry_id, actor_id, kind, description, at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawActivity {
      entry_id:    row.get(0)?,
      actor_id:    row.get(1)?,
      kind:        row.get(2)?,
      description: row.get(3)?,
      at:          row.get(4)?,
    })
  }

  pub fn into_entry(self) -> Result<ActivityEntry> {
    Ok(ActivityEntry {
      entry_id:    decode_uuid(&self.entry_id)?,
      actor_id:    decode_opt_uuid(self.actor_id.as_deref())?,
      kind:        ActivityKind::parse_lossy(&self.kind),
      description: self.description,
      at:          decode_dt(&self.at)?,
    })
  }
}
