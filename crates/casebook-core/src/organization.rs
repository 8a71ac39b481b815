//! Criminal organizations and their directed ally/rival relations.
//!
//! Relations are stored per direction: A listing B as an ally says nothing
//! about whether B lists A. Callers that want symmetry must check both
//! directions, e.g. with [`mutually_allied`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  FieldErrors, Result,
  attrs::{Zone, validate_nonempty, zones_summary},
  profile::IndividualProfile,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriminalOrganization {
  pub organization_id: Uuid,
  /// Principal name first, then aliases.
  pub names:           Vec<String>,
  pub zones:           Vec<Zone>,
  /// Profiles explicitly tagged as leaders.
  pub leader_ids:      Vec<Uuid>,
  /// Authoritative membership.
  pub member_ids:      Vec<Uuid>,
  /// Organizations this one is allied with (outgoing edges only).
  pub ally_ids:        Vec<Uuid>,
  /// Organizations this one is rival of (outgoing edges only).
  pub rival_ids:       Vec<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl CriminalOrganization {
  pub fn principal_name(&self) -> &str {
    self.names.first().map(String::as_str).unwrap_or("")
  }

  /// Principal name, or a placeholder for nameless rows.
  pub fn display_name(&self) -> &str {
    match self.principal_name() {
      "" => "unnamed organization",
      name => name,
    }
  }

  pub fn aliases(&self) -> &[String] {
    self.names.get(1..).unwrap_or(&[])
  }

  pub fn zones_summary(&self) -> String { zones_summary(&self.zones) }

  /// Whether this organization lists `other` as an ally. Directed.
  pub fn is_allied_with(&self, other: Uuid) -> bool { self.ally_ids.contains(&other) }

  /// Whether this organization lists `other` as a rival. Directed.
  pub fn is_rival_of(&self, other: Uuid) -> bool { self.rival_ids.contains(&other) }
}

/// Both organizations list each other as allies.
pub fn mutually_allied(a: &CriminalOrganization, b: &CriminalOrganization) -> bool {
  a.is_allied_with(b.organization_id) && b.is_allied_with(a.organization_id)
}

/// Input to create or replace an organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewOrganization {
  pub names:      Vec<String>,
  pub zones:      Vec<Zone>,
  pub leader_ids: Vec<Uuid>,
  pub member_ids: Vec<Uuid>,
  pub ally_ids:   Vec<Uuid>,
  pub rival_ids:  Vec<Uuid>,
}

impl NewOrganization {
  /// Validate user input. `self_id` is the organization being edited, if any,
  /// so self-relations can be rejected.
  pub fn validated(self, self_id: Option<Uuid>) -> Result<Self> {
    let mut errors = FieldErrors::default();

    let names = match validate_nonempty("names", self.names) {
      Ok(n) => n,
      Err(crate::Error::Validation(f)) => {
        errors.0.extend(f.0);
        Vec::new()
      }
      Err(e) => return Err(e),
    };
    let zones = match validate_nonempty("zones", self.zones) {
      Ok(z) => z,
      Err(crate::Error::Validation(f)) => {
        errors.0.extend(f.0);
        Vec::new()
      }
      Err(e) => return Err(e),
    };

    if let Some(id) = self_id {
      if self.ally_ids.contains(&id) {
        errors.push("ally_ids", "an organization cannot be its own ally");
      }
      if self.rival_ids.contains(&id) {
        errors.push("rival_ids", "an organization cannot be its own rival");
      }
    }

    errors.into_result()?;

    Ok(NewOrganization {
      names,
      zones,
      leader_ids: dedup(self.leader_ids),
      member_ids: dedup(self.member_ids),
      ally_ids: dedup(self.ally_ids),
      rival_ids: dedup(self.rival_ids),
    })
  }
}

/// Remove repeated ids, keeping first-seen order.
fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
  let mut seen = std::collections::HashSet::new();
  ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Listing filter; every field is a case-insensitive substring match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrganizationQuery {
  pub name:  Option<String>,
  pub zone:  Option<String>,
  pub ally:  Option<String>,
  pub rival: Option<String>,
}

impl OrganizationQuery {
  /// Whether `org` passes every filter. `lookup` resolves ally and rival ids
  /// so they can be matched by name; unresolvable ids never match.
  pub fn matches<'a>(
    &self,
    org: &CriminalOrganization,
    lookup: impl Fn(Uuid) -> Option<&'a CriminalOrganization>,
  ) -> bool {
    let named = |o: &CriminalOrganization, needle: &str| {
      o.names.iter().any(|n| contains_folded(n, needle))
    };

    if let Some(needle) = nonblank(&self.name)
      && !named(org, needle)
    {
      return false;
    }
    if let Some(needle) = nonblank(&self.zone)
      && !org.zones.iter().any(|z| contains_folded(&z.summary(), needle))
    {
      return false;
    }
    if let Some(needle) = nonblank(&self.ally)
      && !org.ally_ids.iter().filter_map(|id| lookup(*id)).any(|o| named(o, needle))
    {
      return false;
    }
    if let Some(needle) = nonblank(&self.rival)
      && !org.rival_ids.iter().filter_map(|id| lookup(*id)).any(|o| named(o, needle))
    {
      return false;
    }
    true
  }
}

fn nonblank(filter: &Option<String>) -> Option<&str> {
  filter.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// An organization with its leader and member profiles resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationRoster {
  pub organization: CriminalOrganization,
  pub leaders:      Vec<IndividualProfile>,
  pub members:      Vec<IndividualProfile>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  fn org(id: Uuid, allies: Vec<Uuid>) -> CriminalOrganization {
    CriminalOrganization {
      organization_id: id,
      names:           vec!["Los Halcones".into(), "Halcones".into()],
      zones:           vec![],
      leader_ids:      vec![],
      member_ids:      vec![],
      ally_ids:        allies,
      rival_ids:       vec![],
      created_at:      Utc::now(),
      updated_at:      Utc::now(),
    }
  }

  #[test]
  fn alliance_is_directed() {
    let (a_id, b_id) = (Uuid::new_v4(), Uuid::new_v4());
    let a = org(a_id, vec![b_id]);
    let b = org(b_id, vec![]);
    assert!(a.is_allied_with(b_id));
    assert!(!b.is_allied_with(a_id));
    assert!(!mutually_allied(&a, &b));

    let b = org(b_id, vec![a_id]);
    assert!(mutually_allied(&a, &b));
  }

  #[test]
  fn principal_name_and_aliases() {
    let o = org(Uuid::new_v4(), vec![]);
    assert_eq!(o.principal_name(), "Los Halcones");
    assert_eq!(o.aliases(), ["Halcones".to_owned()]);

    let nameless = CriminalOrganization { names: vec![], ..o };
    assert_eq!(nameless.display_name(), "unnamed organization");
    assert!(nameless.aliases().is_empty());
  }

  #[test]
  fn validated_requires_names_and_zones() {
    let err = NewOrganization::default().validated(None).unwrap_err();
    let Error::Validation(fields) = err else { panic!("expected validation error") };
    let names: Vec<_> = fields.0.iter().map(|f| f.field.as_str()).collect();
    assert_eq!(names, vec!["names", "zones"]);
  }

  #[test]
  fn validated_rejects_self_relations_and_dedups() {
    let id = Uuid::new_v4();
    let other = Uuid::new_v4();
    let input = NewOrganization {
      names: vec![" Los Monos ".into()],
      zones: vec![Zone { city: "Rosario".into(), ..Zone::default() }],
      ally_ids: vec![id],
      ..NewOrganization::default()
    };
    assert!(input.clone().validated(Some(id)).is_err());

    let ok = NewOrganization { ally_ids: vec![other, other], ..input }
      .validated(Some(id))
      .unwrap();
    assert_eq!(ok.names, vec!["Los Monos"]);
    assert_eq!(ok.ally_ids, vec![other]);
  }

  #[test]
  fn query_matches_names_zones_and_related_names() {
    let monos_id = Uuid::new_v4();
    let mut monos = org(monos_id, vec![]);
    monos.names = vec!["Los Monos".into()];

    let mut halcones = org(Uuid::new_v4(), vec![monos_id]);
    halcones.zones = vec![Zone { neighborhood: "Ludueña".into(), ..Zone::default() }];
    let lookup = |id: Uuid| (id == monos_id).then_some(&monos);

    let q = |name: &str, zone: &str, ally: &str, rival: &str| OrganizationQuery {
      name:  Some(name.into()),
      zone:  Some(zone.into()),
      ally:  Some(ally.into()),
      rival: Some(rival.into()),
    };

    assert!(q("halc", "", "", "").matches(&halcones, lookup));
    assert!(q("", "LUDUEÑA", "monos", " ").matches(&halcones, lookup));
    assert!(!q("", "", "", "monos").matches(&halcones, lookup));
    assert!(!q("", "", "halcones", "").matches(&monos, lookup));
    assert!(OrganizationQuery::default().matches(&monos, lookup));
  }
}
