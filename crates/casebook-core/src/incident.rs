//! Criminal incidents: dated events linked to people, organizations and
//! source articles.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{FieldErrors, Result, access::Scoped, attrs::Location};

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum IncidentCategory {
  Robbery,
  Homicide,
  Shooting,
  DrugTrafficking,
  Extortion,
  Other,
}

impl IncidentCategory {
  pub fn label(self) -> &'static str {
    match self {
      Self::Robbery => "Robbery",
      Self::Homicide => "Homicide",
      Self::Shooting => "Shooting",
      Self::DrugTrafficking => "Drug trafficking",
      Self::Extortion => "Extortion",
      Self::Other => "Other",
    }
  }
}

/// Legal qualification of the event.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Qualification {
  #[default]
  Robbery,
  Theft,
  Homicide,
}

impl Qualification {
  pub fn label(self) -> &'static str {
    match self {
      Self::Robbery => "Robbery",
      Self::Theft => "Theft",
      Self::Homicide => "Homicide",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriminalIncident {
  pub incident_id:     Uuid,
  pub date:            NaiveDate,
  pub category:        Option<IncidentCategory>,
  pub location:        Location,
  pub qualification:   Qualification,
  pub description:     String,
  /// Profiles identified as authors.
  pub author_ids:      Vec<Uuid>,
  /// Set when no author could be identified.
  pub author_unknown:  bool,
  pub organization_ids: Vec<Uuid>,
  /// Source news links.
  pub link_ids:        Vec<Uuid>,
  pub created_by:      Option<Uuid>,
  pub created_at:      DateTime<Utc>,
}

impl CriminalIncident {
  pub fn category_label(&self) -> &'static str {
    self.category.map(IncidentCategory::label).unwrap_or("Uncategorized")
  }
}

impl Scoped for CriminalIncident {
  fn owner(&self) -> Option<Uuid> { self.created_by }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIncident {
  pub date:             NaiveDate,
  #[serde(default)]
  pub category:         Option<IncidentCategory>,
  #[serde(default)]
  pub location:         Location,
  #[serde(default)]
  pub qualification:    Qualification,
  pub description:      String,
  #[serde(default)]
  pub author_ids:       Vec<Uuid>,
  #[serde(default)]
  pub author_unknown:   bool,
  #[serde(default)]
  pub organization_ids: Vec<Uuid>,
  #[serde(default)]
  pub link_ids:         Vec<Uuid>,
}

impl NewIncident {
  /// Trim text and reconcile the author flag: naming authors clears it.
  pub fn normalized(self) -> Result<Self> {
    let mut errors = FieldErrors::default();
    let description = self.description.trim().to_owned();
    if description.is_empty() {
      errors.push("description", "is required");
    }
    errors.into_result()?;

    let author_unknown = self.author_unknown && self.author_ids.is_empty();
    Ok(NewIncident { description, author_unknown, ..self })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input() -> NewIncident {
    NewIncident {
      date:             NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
      category:         Some(IncidentCategory::Shooting),
      location:         Location::default(),
      qualification:    Qualification::Homicide,
      description:      "  shots fired ".into(),
      author_ids:       vec![],
      author_unknown:   true,
      organization_ids: vec![],
      link_ids:         vec![],
    }
  }

  #[test]
  fn naming_authors_clears_unknown_flag() {
    let with_author = NewIncident { author_ids: vec![Uuid::new_v4()], ..input() }
      .normalized()
      .unwrap();
    assert!(!with_author.author_unknown);

    let anonymous = input().normalized().unwrap();
    assert!(anonymous.author_unknown);
    assert_eq!(anonymous.description, "shots fired");
  }

  #[test]
  fn description_is_required() {
    assert!(NewIncident { description: "  ".into(), ..input() }.normalized().is_err());
  }

  #[test]
  fn category_parses_snake_case() {
    assert_eq!(
      "drug_trafficking".parse::<IncidentCategory>().unwrap(),
      IncidentCategory::DrugTrafficking
    );
  }
}
