//! Report composition: turns a saved report and the records around it into
//! a fixed sequence of numbered sections ready for document rendering.
//!
//! Every section is always present. When its source data is empty the
//! section carries a placeholder line instead, so downstream renderers can
//! rely on a stable section count.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  incident::CriminalIncident,
  organization::CriminalOrganization,
  profile::IndividualProfile,
  report::OrganizationReport,
};

/// Number of sections [`compose`] always returns.
pub const SECTION_COUNT: usize = 7;

const NO_INFORMATION: &str = "No information available.";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// One numbered block of a composed report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
  pub number: u8,
  pub title:  String,
  /// Never empty.
  pub lines:  Vec<String>,
}

impl Section {
  fn new(number: u8, title: impl Into<String>, lines: Vec<String>) -> Self {
    let lines = if lines.iter().all(|l| l.trim().is_empty()) {
      vec![NO_INFORMATION.to_owned()]
    } else {
      lines
    };
    Section { number, title: title.into(), lines }
  }

  pub fn heading(&self) -> String { format!("Section {} - {}", self.number, self.title) }
}

/// An incident linked to the organization with its author profiles resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentDetail {
  pub incident: CriminalIncident,
  pub authors:  Vec<IndividualProfile>,
}

/// Everything [`compose`] reads. Assembled by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportContext {
  pub report:       OrganizationReport,
  pub organization: CriminalOrganization,
  /// Resolved from the report's derived hierarchy.
  pub leaders:      Vec<IndividualProfile>,
  pub lieutenants:  Vec<IndividualProfile>,
  /// The organization's live member list.
  pub members:      Vec<IndividualProfile>,
  /// Resolved from the report's ally snapshot.
  pub allies:       Vec<CriminalOrganization>,
  /// Resolved from the report's rival snapshot.
  pub rivals:       Vec<CriminalOrganization>,
  /// Newest first.
  pub incidents:    Vec<IncidentDetail>,
}

/// Build the seven report sections. Never fails.
pub fn compose(ctx: &ReportContext) -> Vec<Section> {
  vec![
    Section::new(1, "Executive summary", executive_summary(ctx)),
    Section::new(2, "Introduction", vec![or_placeholder(
      &ctx.report.introduction,
      "No introduction was recorded for this report.",
    )]),
    Section::new(3, "Antecedents", antecedents(ctx)),
    Section::new(
      4,
      or_placeholder(&ctx.report.development_title, "Development"),
      vec![or_placeholder(
        &ctx.report.development_body,
        "No development content was recorded.",
      )],
    ),
    Section::new(5, "Relevant incidents", relevant_incidents(ctx)),
    Section::new(6, "Conclusions", vec![conclusions(&ctx.report)]),
    Section::new(7, "Individual profile sheets", profile_sheets(ctx)),
  ]
}

/// Plain-text rendering of composed sections, one line per entry.
pub fn render_text(title: &str, sections: &[Section]) -> String {
  let mut out = String::new();
  out.push_str(title);
  out.push('\n');
  for section in sections {
    out.push('\n');
    out.push_str(&section.heading());
    out.push('\n');
    for line in &section.lines {
      out.push_str(line);
      out.push('\n');
    }
  }
  out
}

// ─── Sections ────────────────────────────────────────────────────────────────

fn executive_summary(ctx: &ReportContext) -> Vec<String> {
  let report = &ctx.report;
  let mut lines = vec!["Members and hierarchy:".to_owned()];
  lines.extend(membership_roll(ctx));

  lines.push("Zones of influence:".to_owned());
  let zones: Vec<String> = report
    .zones
    .iter()
    .map(|z| z.summary())
    .filter(|s| !s.is_empty())
    .collect();
  if zones.is_empty() {
    lines.push("No zones of influence were recorded.".to_owned());
  } else {
    lines.extend(zones);
  }

  lines.push("Allied organizations:".to_owned());
  lines.extend(organization_names(&ctx.allies, "No alliances recorded."));
  lines.push("Rival organizations:".to_owned());
  lines.extend(organization_names(&ctx.rivals, "No rivals recorded."));

  lines.push("Relevant conclusion:".to_owned());
  lines.push(or_placeholder(
    &report.relevant_conclusion,
    "No relevant conclusion was recorded.",
  ));
  lines.push("Likely evolution:".to_owned());
  lines.push(or_placeholder(
    &report.likely_evolution,
    "No likely evolution was recorded.",
  ));
  lines
}

/// Leaders, then lieutenants, then members holding neither role.
fn membership_roll(ctx: &ReportContext) -> Vec<String> {
  let mut lines = Vec::new();
  if !ctx.leaders.is_empty() {
    lines.push("Identified leaders:".to_owned());
    lines.extend(ctx.leaders.iter().map(roll_entry));
  }
  if !ctx.lieutenants.is_empty() {
    lines.push("Identified lieutenants:".to_owned());
    lines.extend(ctx.lieutenants.iter().map(roll_entry));
  }

  let ranked: HashSet<Uuid> = ctx
    .leaders
    .iter()
    .chain(&ctx.lieutenants)
    .map(|p| p.profile_id)
    .collect();
  let unassigned: Vec<String> = ctx
    .members
    .iter()
    .filter(|p| !ranked.contains(&p.profile_id))
    .map(IndividualProfile::display_name)
    .collect();
  if !unassigned.is_empty() {
    lines.push(format!(
      "Members without hierarchy: {}",
      unassigned.join(", ")
    ));
  }

  if lines.is_empty() {
    lines.push("No members or hierarchy were recorded for this organization.".to_owned());
  }
  lines
}

fn roll_entry(p: &IndividualProfile) -> String {
  format!(
    "  - {} · Document: {} · Custody: {}",
    p.display_name(),
    dash_if_blank(&p.document),
    p.custody.map(|c| c.label()).unwrap_or("-"),
  )
}

fn antecedents(ctx: &ReportContext) -> Vec<String> {
  let mut lines = vec!["Criminal incidents linked to the organization:".to_owned()];
  if ctx.incidents.is_empty() {
    lines.push("No linked criminal incidents were recorded.".to_owned());
  }
  for detail in &ctx.incidents {
    let incident = &detail.incident;
    lines.push(format!(
      "- {} · {} · {} · Qualification {} · Authors: {}",
      incident.date.format(DATE_FORMAT),
      incident.category_label(),
      incident.location.summary(),
      incident.qualification.label(),
      authors_text(detail),
    ));
  }

  if !ctx.report.antecedents.is_empty() {
    lines.push("Additional antecedents:".to_owned());
    for a in &ctx.report.antecedents {
      lines.push(format!(
        "{}: {}",
        or_placeholder(&a.title, "Untitled"),
        or_placeholder(&a.description, "No description"),
      ));
    }
  }
  lines
}

fn authors_text(detail: &IncidentDetail) -> String {
  if !detail.authors.is_empty() {
    let names: Vec<String> = detail.authors.iter().map(IndividualProfile::display_name).collect();
    return names.join(", ");
  }
  if detail.incident.author_unknown {
    "unidentified author".to_owned()
  } else {
    "none recorded".to_owned()
  }
}

fn relevant_incidents(ctx: &ReportContext) -> Vec<String> {
  if ctx.incidents.is_empty() {
    return vec!["No criminal incidents are linked to this organization.".to_owned()];
  }
  let mut lines = Vec::new();
  for detail in &ctx.incidents {
    let incident = &detail.incident;
    let date = incident.date.format(DATE_FORMAT);
    lines.push(format!("{} - {date}", incident.category_label()));
    lines.push(format!("Date: {date}"));
    lines.push(format!("Place: {}", incident.location.summary()));
    lines.push(format!(
      "Description: {}",
      or_placeholder(&incident.description, "No description recorded.")
    ));
  }
  lines
}

/// The closing conclusions, falling back to the relevant conclusion from the
/// executive summary for reports saved before the two were split.
fn conclusions(report: &OrganizationReport) -> String {
  if !report.conclusions.trim().is_empty() {
    return report.conclusions.trim().to_owned();
  }
  or_placeholder(
    &report.relevant_conclusion,
    "No conclusions were recorded in this report.",
  )
}

fn profile_sheets(ctx: &ReportContext) -> Vec<String> {
  let sheets: Vec<String> = ctx
    .leaders
    .iter()
    .chain(&ctx.lieutenants)
    .map(|p| {
      format!(
        "{} · Document: {} · Role: {} · Aliases: {} · Phones: {}",
        p.display_name(),
        dash_if_blank(&p.document),
        p.role.map(|r| r.label()).unwrap_or("-"),
        joined_or(&p.aliases, "no aliases"),
        joined_or(&p.phones, "no phones"),
      )
    })
    .collect();
  if sheets.is_empty() {
    vec!["No individual profile sheets are attached to this report.".to_owned()]
  } else {
    sheets
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn organization_names(orgs: &[CriminalOrganization], empty: &str) -> Vec<String> {
  if orgs.is_empty() {
    return vec![empty.to_owned()];
  }
  orgs.iter().map(|o| format!("- {}", o.display_name())).collect()
}

fn or_placeholder(text: &str, placeholder: &str) -> String {
  match text.trim() {
    "" => placeholder.to_owned(),
    t => t.to_owned(),
  }
}

fn dash_if_blank(text: &str) -> &str {
  match text.trim() {
    "" => "-",
    t => t,
  }
}

fn joined_or(items: &[String], empty: &str) -> String {
  if items.is_empty() { empty.to_owned() } else { items.join(", ") }
}

#[cfg(test)]
mod tests {
  use chrono::{NaiveDate, Utc};

  use super::*;
  use crate::{
    attrs::{Antecedent, Location, Zone},
    incident::{IncidentCategory, Qualification},
    profile::MemberRole,
  };

  fn organization(name: &str) -> CriminalOrganization {
    CriminalOrganization {
      organization_id: Uuid::new_v4(),
      names:           vec![name.to_owned()],
      zones:           vec![],
      leader_ids:      vec![],
      member_ids:      vec![],
      ally_ids:        vec![],
      rival_ids:       vec![],
      created_at:      Utc::now(),
      updated_at:      Utc::now(),
    }
  }

  fn blank_report(organization_id: Uuid) -> OrganizationReport {
    OrganizationReport {
      report_id: Uuid::new_v4(),
      organization_id,
      introduction: String::new(),
      relevant_conclusion: String::new(),
      likely_evolution: String::new(),
      development_title: String::new(),
      development_body: String::new(),
      conclusions: String::new(),
      antecedents: vec![],
      zones: vec![],
      ally_ids: vec![],
      rival_ids: vec![],
      hierarchy: vec![],
      export_count: 0,
      created_by: None,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn person(surname: &str, role: Option<MemberRole>) -> IndividualProfile {
    IndividualProfile {
      profile_id:  Uuid::new_v4(),
      surname:     surname.to_owned(),
      name:        "Juan".into(),
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

  fn empty_context() -> ReportContext {
    let organization = organization("Los Halcones");
    ReportContext {
      report: blank_report(organization.organization_id),
      organization,
      leaders: vec![],
      lieutenants: vec![],
      members: vec![],
      allies: vec![],
      rivals: vec![],
      incidents: vec![],
    }
  }

  #[test]
  fn empty_report_still_has_seven_nonempty_sections() {
    let sections = compose(&empty_context());
    assert_eq!(sections.len(), SECTION_COUNT);
    for (i, section) in sections.iter().enumerate() {
      assert_eq!(usize::from(section.number), i + 1);
      assert!(!section.lines.is_empty());
      assert!(section.lines.iter().any(|l| !l.trim().is_empty()));
    }
    assert_eq!(sections[3].title, "Development");
    assert_eq!(sections[5].lines, vec!["No conclusions were recorded in this report."]);
  }

  #[test]
  fn roll_lists_leaders_then_lieutenants_then_the_rest() {
    let mut ctx = empty_context();
    let boss = person("Boss", Some(MemberRole::Leader));
    let right_hand = person("Hand", Some(MemberRole::Lieutenant));
    let runner = person("Runner", None);
    ctx.members = vec![runner.clone(), right_hand.clone(), boss.clone()];
    ctx.leaders = vec![boss];
    ctx.lieutenants = vec![right_hand];

    let summary = &compose(&ctx)[0].lines;
    let pos = |needle: &str| summary.iter().position(|l| l.contains(needle)).unwrap();
    assert!(pos("Boss, Juan") < pos("Hand, Juan"));
    assert!(pos("Hand, Juan") < pos("Runner, Juan"));
    assert!(summary.contains(&"Members without hierarchy: Runner, Juan".to_owned()));
  }

  #[test]
  fn incidents_feed_antecedents_and_relevant_incidents() {
    let mut ctx = empty_context();
    ctx.report.antecedents = vec![Antecedent { title: "Origins".into(), description: String::new() }];
    ctx.incidents = vec![IncidentDetail {
      incident: CriminalIncident {
        incident_id:      Uuid::new_v4(),
        date:             NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        category:         Some(IncidentCategory::Shooting),
        location:         Location { city: "Rosario".into(), ..Location::default() },
        qualification:    Qualification::Homicide,
        description:      String::new(),
        author_ids:       vec![],
        author_unknown:   true,
        organization_ids: vec![ctx.organization.organization_id],
        link_ids:         vec![],
        created_by:       None,
        created_at:       Utc::now(),
      },
      authors:  vec![],
    }];

    let sections = compose(&ctx);
    assert!(sections[2].lines.contains(
      &"- 2024-03-09 · Shooting · Rosario · Qualification Homicide · Authors: unidentified author"
        .to_owned()
    ));
    assert!(sections[2].lines.contains(&"Origins: No description".to_owned()));
    assert_eq!(sections[4].lines, vec![
      "Shooting - 2024-03-09",
      "Date: 2024-03-09",
      "Place: Rosario",
      "Description: No description recorded.",
    ]);
  }

  #[test]
  fn summary_uses_snapshot_zones_and_allies() {
    let mut ctx = empty_context();
    ctx.report.zones = vec![Zone { city: "Rosario".into(), ..Zone::default() }];
    ctx.allies = vec![organization("Los Monos")];
    let summary = &compose(&ctx)[0].lines;
    assert!(summary.contains(&"Rosario".to_owned()));
    assert!(summary.contains(&"- Los Monos".to_owned()));
    assert!(summary.contains(&"No rivals recorded.".to_owned()));
  }

  #[test]
  fn profile_sheets_cover_leaders_and_lieutenants() {
    let mut ctx = empty_context();
    let mut boss = person("Boss", Some(MemberRole::Leader));
    boss.aliases = vec!["El Jefe".into()];
    boss.document = "30111222".into();
    ctx.leaders = vec![boss];
    ctx.lieutenants = vec![person("Hand", Some(MemberRole::Lieutenant))];

    let sheets = &compose(&ctx)[6].lines;
    assert_eq!(sheets.len(), 2);
    assert_eq!(
      sheets[0],
      "Boss, Juan · Document: 30111222 · Role: Leader · Aliases: El Jefe · Phones: no phones"
    );
  }

  #[test]
  fn explicit_conclusions_take_precedence() {
    let mut ctx = empty_context();
    ctx.report.relevant_conclusion = "Expanding south".into();
    assert_eq!(compose(&ctx)[5].lines, vec!["Expanding south"]);
    ctx.report.conclusions = "Dismantled in 2024".into();
    assert_eq!(compose(&ctx)[5].lines, vec!["Dismantled in 2024"]);
  }

  #[test]
  fn rendered_text_contains_every_heading() {
    let sections = compose(&empty_context());
    let text = render_text("Los Halcones", &sections);
    for s in &sections {
      assert!(text.contains(&s.heading()));
    }
  }
}
