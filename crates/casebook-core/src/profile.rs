//! Individual profiles: people of interest.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  FieldErrors, Result,
  access::Scoped,
  attrs::{Address, Employer, Vehicle, normalize_all},
};

/// Position held inside a criminal organization, as recorded on the profile.
///
/// Parsing is case-insensitive and also accepts the Spanish labels found in
/// older rows.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum MemberRole {
  #[strum(to_string = "foot_soldier", serialize = "soldadito")]
  FootSoldier,
  #[strum(to_string = "hitman", serialize = "sicario")]
  Hitman,
  #[strum(to_string = "lieutenant", serialize = "lugarteniente")]
  Lieutenant,
  #[strum(to_string = "leader", serialize = "lider", serialize = "líder")]
  Leader,
}

impl MemberRole {
  pub fn parse_lossy(s: &str) -> Option<Self> { s.trim().parse().ok() }

  pub fn label(self) -> &'static str {
    match self {
      Self::FootSoldier => "Foot soldier",
      Self::Hitman => "Hitman",
      Self::Lieutenant => "Lieutenant",
      Self::Leader => "Leader",
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum CustodyStatus {
  #[strum(to_string = "free", serialize = "libertad")]
  Free,
  #[strum(to_string = "deceased", serialize = "fallecido")]
  Deceased,
  #[strum(to_string = "detained", serialize = "detenido")]
  Detained,
  #[strum(to_string = "house_arrest", serialize = "domiciliaria")]
  HouseArrest,
  #[strum(to_string = "fugitive", serialize = "profugo", serialize = "prófugo")]
  Fugitive,
}

impl CustodyStatus {
  pub fn parse_lossy(s: &str) -> Option<Self> { s.trim().parse().ok() }

  pub fn label(self) -> &'static str {
    match self {
      Self::Free => "Free",
      Self::Deceased => "Deceased",
      Self::Detained => "Detained",
      Self::HouseArrest => "House arrest",
      Self::Fugitive => "Fugitive",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualProfile {
  pub profile_id:      Uuid,
  pub surname:         String,
  pub name:            String,
  /// National document number; unique across profiles when non-empty.
  pub document:        String,
  pub tax_id:          Option<i64>,
  pub nationality:     String,
  pub role:            Option<MemberRole>,
  pub custody:         Option<CustodyStatus>,
  pub occupation:      String,
  pub birth_date:      Option<NaiveDate>,
  pub aliases:         Vec<String>,
  pub phones:          Vec<String>,
  pub addresses:       Vec<Address>,
  pub vehicles:        Vec<Vehicle>,
  pub employers:       Vec<Employer>,
  /// The actor who created the profile.
  pub owner:           Option<Uuid>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl IndividualProfile {
  /// "Surname, Name", tolerating either part being blank.
  pub fn display_name(&self) -> String {
    let full = format!("{}, {}", self.surname.trim(), self.name.trim());
    let full = full.trim_matches(|c| c == ',' || c == ' ');
    if full.is_empty() { "unnamed individual".to_owned() } else { full.to_owned() }
  }

  pub fn has_role(&self, role: MemberRole) -> bool { self.role == Some(role) }
}

impl Scoped for IndividualProfile {
  fn owner(&self) -> Option<Uuid> { self.owner }
}

/// Input to [`crate::store::CaseStore::create_profile`] and
/// [`crate::store::CaseStore::update_profile`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProfile {
  pub surname:     String,
  pub name:        String,
  pub document:    String,
  pub tax_id:      Option<i64>,
  pub nationality: String,
  pub role:        Option<MemberRole>,
  pub custody:     Option<CustodyStatus>,
  pub occupation:  String,
  pub birth_date:  Option<NaiveDate>,
  pub aliases:     Vec<String>,
  pub phones:      Vec<String>,
  pub addresses:   Vec<Address>,
  pub vehicles:    Vec<Vehicle>,
  pub employers:   Vec<Employer>,
}

impl NewProfile {
  /// Trim text, drop blank sub-records and check field formats. Uniqueness of
  /// the document number is the store's job.
  pub fn normalized(self) -> Result<Self> {
    let mut errors = FieldErrors::default();

    let document = self.document.trim().to_owned();
    if !document.chars().all(|c| c.is_ascii_digit()) {
      errors.push("document", "must contain digits only");
    } else if document.len() > 8 {
      errors.push("document", "must be at most 8 digits");
    }

    let surname = self.surname.trim().to_owned();
    let name = self.name.trim().to_owned();
    if surname.is_empty() && name.is_empty() && document.is_empty() {
      errors.push("surname", "a name or document number is required");
    }

    errors.into_result()?;

    Ok(NewProfile {
      surname,
      name,
      document,
      tax_id: self.tax_id,
      nationality: self.nationality.trim().to_owned(),
      role: self.role,
      custody: self.custody,
      occupation: self.occupation.trim().to_owned(),
      birth_date: self.birth_date,
      aliases: normalize_all(self.aliases),
      phones: normalize_all(self.phones),
      addresses: normalize_all(self.addresses),
      vehicles: normalize_all(self.vehicles),
      employers: normalize_all(self.employers),
    })
  }
}
