//! News-source submissions ("links") and their review status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result, access::Scoped};

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
pub enum LinkStatus {
  #[default]
  Pending,
  Approved,
  Discarded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRecord {
  pub link_id:              Uuid,
  pub url:                  String,
  /// Outlet the link was published by, e.g. a newspaper name.
  pub outlet:               Option<String>,
  pub status:               LinkStatus,
  /// Set while the link is approved.
  pub approved_at:          Option<DateTime<Utc>>,
  pub categories:           Vec<String>,
  pub reviewed_by_classifier: bool,
  pub reviewed_by_editor:   bool,
  pub owner:                Uuid,
  pub submitted_at:         DateTime<Utc>,
}

impl LinkRecord {
  /// Apply a status change, keeping `approved_at` consistent with it.
  pub fn set_status(&mut self, status: LinkStatus, now: DateTime<Utc>) {
    self.status = status;
    match status {
      LinkStatus::Approved => {
        self.approved_at.get_or_insert(now);
      }
      LinkStatus::Pending | LinkStatus::Discarded => self.approved_at = None,
    }
  }
}

impl Scoped for LinkRecord {
  fn owner(&self) -> Option<Uuid> { Some(self.owner) }

  fn is_finalized(&self) -> bool { self.status == LinkStatus::Approved }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLink {
  pub url:        String,
  #[serde(default)]
  pub outlet:     Option<String>,
  #[serde(default)]
  pub categories: Vec<String>,
}

impl NewLink {
  pub fn normalized(self) -> Result<Self> {
    let url = self.url.trim().to_owned();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
      return Err(Error::invalid("url", "must be an http(s) URL"));
    }
    Ok(NewLink {
      url,
      outlet: self.outlet.map(|o| o.trim().to_owned()).filter(|o| !o.is_empty()),
      categories: crate::attrs::normalize_all(self.categories),
    })
  }
}

/// A review decision on a link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReview {
  pub status:               LinkStatus,
  #[serde(default)]
  pub categories:           Option<Vec<String>>,
  #[serde(default)]
  pub reviewed_by_classifier: Option<bool>,
  #[serde(default)]
  pub reviewed_by_editor:   Option<bool>,
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn link() -> LinkRecord {
    LinkRecord {
      link_id: Uuid::new_v4(),
      url: "https://example.com/a".into(),
      outlet: None,
      status: LinkStatus::Pending,
      approved_at: None,
      categories: vec![],
      reviewed_by_classifier: false,
      reviewed_by_editor: false,
      owner: Uuid::new_v4(),
      submitted_at: Utc::now(),
    }
  }

  #[test]
  fn approval_stamps_once_and_other_states_clear() {
    let mut l = link();
    let t0 = Utc::now();
    l.set_status(LinkStatus::Approved, t0);
    assert_eq!(l.approved_at, Some(t0));

    l.set_status(LinkStatus::Approved, t0 + Duration::hours(1));
    assert_eq!(l.approved_at, Some(t0));

    l.set_status(LinkStatus::Discarded, t0);
    assert_eq!(l.approved_at, None);
    assert!(!l.is_finalized());
  }

  #[test]
  fn url_must_be_http() {
    let bad = NewLink { url: "ftp://x".into(), outlet: None, categories: vec![] };
    assert!(bad.normalized().is_err());
    let ok = NewLink { url: " https://x.org ".into(), outlet: Some(" ".into()), categories: vec![] }
      .normalized()
      .unwrap();
    assert_eq!(ok.url, "https://x.org");
    assert_eq!(ok.outlet, None);
  }
}
