//! Actors and the closed role enumeration that drives every authorization
//! decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

/// The single authorization axis. There are no per-object ACLs.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
  Administrator,
  PressOfficer,
  Classifier,
  Editor,
  ReportsOfficer,
  Management,
  ProductionManager,
  Observer,
  Client,
}

impl Role {
  /// Parse stored role text. Anything unrecognised yields `None`, which every
  /// access decision treats as "no access".
  pub fn parse_lossy(s: &str) -> Option<Self> { s.trim().parse().ok() }
}

/// A system user. The role is fixed for the lifetime of a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id:   Uuid,
  pub username:   String,
  /// `None` when the stored role text is not a known role.
  pub role:       Option<Role>,
  pub created_at: DateTime<Utc>,
}

impl Actor {
  pub fn has_role(&self, role: Role) -> bool { self.role == Some(role) }
}
