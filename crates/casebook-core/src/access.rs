//! Ownership & visibility filter.
//!
//! Every decision here is a pure function of the [`Actor`] and the record
//! kind. An actor without a recognised role sees nothing and may do nothing.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use uuid::Uuid;

use crate::{
  Error, Result,
  actor::{Actor, Role},
};

// ─── Kinds and actions ───────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
  Profile,
  Incident,
  /// A news-source submission.
  Link,
  Organization,
  Report,
  Activity,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  View,
  Create,
  Update,
  Delete,
}

// ─── Scope ───────────────────────────────────────────────────────────────────

/// The subset of records a query may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scope {
  /// Nothing is visible; overrides the other fields.
  pub deny_all:       bool,
  /// Only records owned by this actor.
  pub owner:          Option<Uuid>,
  /// Only records in their approved/finalized state.
  pub finalized_only: bool,
}

impl Scope {
  pub fn all() -> Self { Self::default() }

  pub fn nothing() -> Self { Self { deny_all: true, ..Self::default() } }

  pub fn owned_by(owner: Uuid) -> Self {
    Self { owner: Some(owner), ..Self::default() }
  }

  pub fn finalized() -> Self {
    Self { finalized_only: true, ..Self::default() }
  }

  /// Intersection of two scopes.
  pub fn narrow(self, other: Scope) -> Scope {
    if self.deny_all || other.deny_all {
      return Scope::nothing();
    }
    let owner = match (self.owner, other.owner) {
      (Some(a), Some(b)) if a != b => return Scope::nothing(),
      (a, b) => a.or(b),
    };
    Scope {
      deny_all: false,
      owner,
      finalized_only: self.finalized_only || other.finalized_only,
    }
  }

  /// Whether a single record falls inside this scope.
  pub fn admits(&self, owner: Option<Uuid>, finalized: bool) -> bool {
    if self.deny_all {
      return false;
    }
    if let Some(required) = self.owner
      && owner != Some(required)
    {
      return false;
    }
    !self.finalized_only || finalized
  }
}

/// Implemented by records that participate in ownership filtering.
pub trait Scoped {
  fn owner(&self) -> Option<Uuid>;
  /// Records without a review lifecycle are always finalized.
  fn is_finalized(&self) -> bool { true }
}

// ─── Query ───────────────────────────────────────────────────────────────────

/// Base listing query for profiles, incidents and links. Backends translate
/// `scope` into their own filter.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub scope:  Scope,
  /// Case-insensitive substring filter on the record's main text fields.
  pub text:   Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

// ─── Rules ───────────────────────────────────────────────────────────────────

/// The scope a role grants over a record kind, before any caller filter.
fn role_scope(actor: &Actor, kind: RecordKind) -> Scope {
  use RecordKind as K;
  use Role as R;

  let Some(role) = actor.role else {
    return Scope::nothing();
  };

  match (role, kind) {
    (R::Administrator | R::Management, _) => Scope::all(),
    (_, K::Activity) => Scope::nothing(),
    (R::Editor, _) => Scope::all(),
    (_, K::Organization | K::Report) => Scope::nothing(),
    (R::PressOfficer, _) => Scope::owned_by(actor.actor_id),
    (R::Client | R::Observer, _) => Scope::finalized(),
    (R::ReportsOfficer, K::Profile) => Scope::owned_by(actor.actor_id),
    (R::ReportsOfficer, _) => Scope::finalized(),
    (R::Classifier | R::ProductionManager, _) => Scope::all(),
  }
}

/// Narrow `base` to what `actor` may see of `kind`.
pub fn visible_scope(actor: &Actor, kind: RecordKind, base: RecordQuery) -> RecordQuery {
  let scope = base.scope.narrow(role_scope(actor, kind));
  RecordQuery { scope, ..base }
}

/// In-memory form of [`visible_scope`].
pub fn visible<'a, T: Scoped>(
  actor: &Actor,
  kind: RecordKind,
  records: &'a [T],
) -> Vec<&'a T> {
  let scope = role_scope(actor, kind);
  records
    .iter()
    .filter(|r| scope.admits(r.owner(), r.is_finalized()))
    .collect()
}

/// Whether `actor` may perform `action` on a record of `kind` owned by
/// `owner` (`None` for creation or records without a recorded owner).
pub fn permits(actor: &Actor, kind: RecordKind, action: Action, owner: Option<Uuid>) -> bool {
  use Action as A;
  use RecordKind as K;
  use Role as R;

  let Some(role) = actor.role else {
    return false;
  };
  let own = owner == Some(actor.actor_id);

  match (kind, action) {
    (_, A::View) => !role_scope(actor, kind).deny_all,

    (K::Profile, A::Delete) => matches!(role, R::Administrator | R::Management),
    (K::Profile, _) => matches!(role, R::Administrator | R::Management | R::ReportsOfficer),

    (K::Incident, A::Create) => matches!(role, R::Administrator | R::Editor),
    (K::Incident, A::Update | A::Delete) => match role {
      R::Administrator => true,
      R::Editor => owner.is_none() || own,
      _ => false,
    },

    (K::Link, A::Create) => matches!(role, R::Administrator | R::PressOfficer),
    (K::Link, A::Update) => match role {
      R::Administrator | R::Classifier | R::Editor | R::Management => true,
      R::PressOfficer => own,
      _ => false,
    },
    (K::Link, A::Delete) => match role {
      R::Administrator => true,
      R::PressOfficer => own,
      _ => false,
    },

    (K::Organization | K::Report, _) => matches!(role, R::Administrator | R::Editor),

    (K::Activity, _) => role == R::Administrator,
  }
}

/// [`permits`] as a `Result`, for `?` at handler boundaries.
pub fn require(actor: &Actor, kind: RecordKind, action: Action, owner: Option<Uuid>) -> Result<()> {
  if permits(actor, kind, action, owner) {
    Ok(())
  } else {
    Err(Error::AccessDenied { role: actor.role, kind, action })
  }
}

/// Form default: the actor's own records, or every record when they own none.
/// A convenience only; never an access boundary.
pub fn preselect_owned<'a, T: Scoped>(actor: &Actor, records: &'a [T]) -> Vec<&'a T> {
  let own: Vec<&T> = records
    .iter()
    .filter(|r| r.owner() == Some(actor.actor_id))
    .collect();
  if own.is_empty() { records.iter().collect() } else { own }
}
