//! Organization reports and the derived membership hierarchy.
//!
//! The hierarchy on a report is a projection of the organization's live
//! membership, rebuilt from scratch by [`derive_hierarchy`] every time the
//! report is saved. It is never edited directly; anything written to it
//! outside a save is overwritten by the next one.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  attrs::{Antecedent, Zone, normalize_all},
  organization::OrganizationRoster,
  profile::{IndividualProfile, MemberRole},
};

// ─── Hierarchy ───────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HierarchyRole {
  Leader,
  Lieutenant,
}

/// One row of the derived hierarchy. Unique per `(report_id, member_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipRecord {
  pub report_id: Uuid,
  pub member_id: Uuid,
  pub role:      HierarchyRole,
}

/// What to do when no member is tagged as a lieutenant.
///
/// `AllRemainingMembers` treats every non-leader member as a lieutenant. That
/// labels ordinary members as lieutenants and is pending confirmation with the
/// people who read these reports; `None` leaves the lieutenant list empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LieutenantFallback {
  #[default]
  AllRemainingMembers,
  None,
}

/// Leaders and lieutenants selected from a roster, in roster order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hierarchy {
  pub leaders:     Vec<Uuid>,
  pub lieutenants: Vec<Uuid>,
}

impl Hierarchy {
  pub fn into_records(self, report_id: Uuid) -> Vec<MembershipRecord> {
    let leaders = self.leaders.into_iter().map(|member_id| MembershipRecord {
      report_id,
      member_id,
      role: HierarchyRole::Leader,
    });
    let lieutenants = self.lieutenants.into_iter().map(|member_id| MembershipRecord {
      report_id,
      member_id,
      role: HierarchyRole::Lieutenant,
    });
    leaders.chain(lieutenants).collect()
  }
}

/// Select leaders and lieutenants from an organization roster.
///
/// 1. Leaders are the explicitly tagged leaders; when there are none, the
///    members whose profile role is leader.
/// 2. Lieutenants are the non-leader members whose profile role is
///    lieutenant; when there are none, `fallback` decides.
///
/// A person appears at most once; leader wins over lieutenant.
pub fn derive_hierarchy(roster: &OrganizationRoster, fallback: LieutenantFallback) -> Hierarchy {
  let mut seen = HashSet::new();

  let mut leaders: Vec<Uuid> = roster
    .leaders
    .iter()
    .map(|p| p.profile_id)
    .filter(|id| seen.insert(*id))
    .collect();
  if leaders.is_empty() {
    leaders = roster
      .members
      .iter()
      .filter(|p| p.has_role(MemberRole::Leader))
      .map(|p| p.profile_id)
      .filter(|id| seen.insert(*id))
      .collect();
  }

  let remaining: Vec<&IndividualProfile> = roster
    .members
    .iter()
    .filter(|p| !seen.contains(&p.profile_id))
    .collect();

  let mut picked = HashSet::new();
  let mut lieutenants: Vec<Uuid> = remaining
    .iter()
    .filter(|p| p.has_role(MemberRole::Lieutenant))
    .map(|p| p.profile_id)
    .filter(|id| picked.insert(*id))
    .collect();
  if lieutenants.is_empty() && fallback == LieutenantFallback::AllRemainingMembers {
    lieutenants = remaining
      .iter()
      .map(|p| p.profile_id)
      .filter(|id| picked.insert(*id))
      .collect();
  }

  Hierarchy { leaders, lieutenants }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A narrative report on exactly one organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationReport {
  pub report_id:           Uuid,
  pub organization_id:     Uuid,
  pub introduction:        String,
  pub relevant_conclusion: String,
  pub likely_evolution:    String,
  pub development_title:   String,
  pub development_body:    String,
  pub conclusions:         String,
  pub antecedents:         Vec<Antecedent>,
  /// Copied from the organization on every save.
  pub zones:               Vec<Zone>,
  /// Snapshot of the organization's allies at save time.
  pub ally_ids:            Vec<Uuid>,
  /// Snapshot of the organization's rivals at save time.
  pub rival_ids:           Vec<Uuid>,
  /// Derived on every save; see [`derive_hierarchy`].
  pub hierarchy:           Vec<MembershipRecord>,
  pub export_count:        u32,
  pub created_by:          Option<Uuid>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

impl OrganizationReport {
  pub fn member_ids(&self, role: HierarchyRole) -> Vec<Uuid> {
    self
      .hierarchy
      .iter()
      .filter(|m| m.role == role)
      .map(|m| m.member_id)
      .collect()
  }
}

/// The user-editable part of a report. Everything else is derived at save.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDraft {
  pub introduction:        String,
  pub relevant_conclusion: String,
  pub likely_evolution:    String,
  pub development_title:   String,
  pub development_body:    String,
  pub conclusions:         String,
  pub antecedents:         Vec<Antecedent>,
}

impl ReportDraft {
  pub fn normalized(self) -> Self {
    ReportDraft {
      introduction:        self.introduction.trim().to_owned(),
      relevant_conclusion: self.relevant_conclusion.trim().to_owned(),
      likely_evolution:    self.likely_evolution.trim().to_owned(),
      development_title:   self.development_title.trim().to_owned(),
      development_body:    self.development_body.trim().to_owned(),
      conclusions:         self.conclusions.trim().to_owned(),
      antecedents:         normalize_all(self.antecedents),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::organization::CriminalOrganization;

  fn profile(n: u128, role: Option<MemberRole>) -> IndividualProfile {
    IndividualProfile {
      profile_id:  Uuid::from_u128(n),
      surname:     format!("Surname{n}"),
      name:        "Name".into(),
      document:    String::new(),
      tax_id:      None,
      nationality: String::new(),
      role,
      custody:     None,
      occupation:  String::new(),
      birth_date:  None,
      aliases:     vec![],
      phones:      vec![],
      addresses:   vec![],
      vehicles:    vec![],
      employers:   vec![],
      owner:       None,
      created_at:  Utc::now(),
      updated_at:  Utc::now(),
    }
  }

  fn roster(leaders: Vec<IndividualProfile>, members: Vec<IndividualProfile>) -> OrganizationRoster {
    OrganizationRoster {
      organization: CriminalOrganization {
        organization_id: Uuid::new_v4(),
        names:           vec!["Los Halcones".into()],
        zones:           vec![],
        leader_ids:      leaders.iter().map(|p| p.profile_id).collect(),
        member_ids:      members.iter().map(|p| p.profile_id).collect(),
        ally_ids:        vec![],
        rival_ids:       vec![],
        created_at:      Utc::now(),
        updated_at:      Utc::now(),
      },
      leaders,
      members,
    }
  }

  fn id(n: u128) -> Uuid { Uuid::from_u128(n) }

  #[test]
  fn untagged_members_all_become_lieutenants() {
    // Profile #1 is "lider", #2 and #3 are foot soldiers; with nobody tagged
    // as lieutenant the fallback promotes both soldiers.
    let r = roster(vec![], vec![
      profile(1, MemberRole::parse_lossy("lider")),
      profile(2, MemberRole::parse_lossy("soldadito")),
      profile(3, MemberRole::parse_lossy("soldadito")),
    ]);
    let h = derive_hierarchy(&r, LieutenantFallback::AllRemainingMembers);
    assert_eq!(h.leaders, vec![id(1)]);
    assert_eq!(h.lieutenants, vec![id(2), id(3)]);
  }

  #[test]
  fn fallback_can_be_disabled() {
    let r = roster(vec![], vec![
      profile(1, Some(MemberRole::Leader)),
      profile(2, Some(MemberRole::FootSoldier)),
    ]);
    let h = derive_hierarchy(&r, LieutenantFallback::None);
    assert_eq!(h.leaders, vec![id(1)]);
    assert!(h.lieutenants.is_empty());
  }

  #[test]
  fn explicit_leaders_win_over_profile_roles() {
    let r = roster(vec![profile(9, None)], vec![
      profile(1, Some(MemberRole::Leader)),
      profile(2, Some(MemberRole::Lieutenant)),
      profile(3, None),
    ]);
    let h = derive_hierarchy(&r, LieutenantFallback::AllRemainingMembers);
    assert_eq!(h.leaders, vec![id(9)]);
    assert_eq!(h.lieutenants, vec![id(2)]);
  }

  #[test]
  fn leader_who_is_also_member_is_not_a_lieutenant() {
    let boss = profile(1, Some(MemberRole::Lieutenant));
    let r = roster(vec![boss.clone()], vec![boss, profile(2, None)]);
    let h = derive_hierarchy(&r, LieutenantFallback::AllRemainingMembers);
    assert_eq!(h.leaders, vec![id(1)]);
    assert_eq!(h.lieutenants, vec![id(2)]);

    let records = h.into_records(Uuid::nil());
    let members: HashSet<_> = records.iter().map(|m| m.member_id).collect();
    assert_eq!(members.len(), records.len());
  }

  #[test]
  fn duplicate_roster_entries_collapse() {
    let r = roster(vec![], vec![
      profile(2, Some(MemberRole::Lieutenant)),
      profile(2, Some(MemberRole::Lieutenant)),
    ]);
    let h = derive_hierarchy(&r, LieutenantFallback::AllRemainingMembers);
    assert!(h.leaders.is_empty());
    assert_eq!(h.lieutenants, vec![id(2)]);
  }

  #[test]
  fn derivation_is_deterministic() {
    let r = roster(vec![], vec![
      profile(1, Some(MemberRole::Leader)),
      profile(2, None),
      profile(3, Some(MemberRole::Hitman)),
    ]);
    let first = derive_hierarchy(&r, LieutenantFallback::default()).into_records(Uuid::nil());
    let second = derive_hierarchy(&r, LieutenantFallback::default()).into_records(Uuid::nil());
    assert_eq!(first, second);
  }

  #[test]
  fn empty_roster_yields_empty_hierarchy() {
    let h = derive_hierarchy(&roster(vec![], vec![]), LieutenantFallback::default());
    assert_eq!(h, Hierarchy::default());
  }
}
