//! Append-only log of who did what.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::access::RecordKind;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActivityKind {
  Create,
  Update,
  Delete,
  StatusChange,
  ReportExport,
  Other,
}

impl ActivityKind {
  /// Decode stored text; unknown values become [`ActivityKind::Other`].
  pub fn parse_lossy(s: &str) -> Self { s.trim().parse().unwrap_or(Self::Other) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
  pub entry_id:    Uuid,
  /// `None` for system actions such as the startup bootstrap.
  pub actor_id:    Option<Uuid>,
  pub kind:        ActivityKind,
  pub description: String,
  pub at:          DateTime<Utc>,
}

/// An entry to append.
#[derive(Debug, Clone)]
pub struct NewActivity {
  pub actor_id:    Option<Uuid>,
  pub kind:        ActivityKind,
  pub description: String,
}

impl NewActivity {
  /// A "`<kind> <record> <id>`" entry for a write on a single record.
  pub fn record(
    actor_id: Option<Uuid>,
    kind: ActivityKind,
    record: RecordKind,
    id: Uuid,
  ) -> Self {
    NewActivity {
      actor_id,
      kind,
      description: format!("{kind} {record} {id}"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_kind_text_is_other() {
    assert_eq!(ActivityKind::parse_lossy("status_change"), ActivityKind::StatusChange);
    assert_eq!(ActivityKind::parse_lossy("login"), ActivityKind::Other);
  }

  #[test]
  fn record_entry_describes_the_write() {
    let id = Uuid::nil();
    let entry = NewActivity::record(None, ActivityKind::Delete, RecordKind::Profile, id);
    assert_eq!(entry.description, format!("delete profile {id}"));
  }
}
