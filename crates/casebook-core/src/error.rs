//! Error types for `casebook-core`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  access::{Action, RecordKind},
  actor::Role,
};

/// A single field-level validation message, surfaced to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

/// The non-empty set of field errors carried by [`Error::Validation`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError::new(field, message));
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  /// `Ok(())` when no errors were collected, otherwise [`Error::Validation`].
  pub fn into_result(self) -> Result<()> {
    if self.0.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
  }
}

impl fmt::Display for FieldErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let parts: Vec<String> = self
      .0
      .iter()
      .map(|e| format!("{}: {}", e.field, e.message))
      .collect();
    f.write_str(&parts.join("; "))
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("{kind} not found: {id}")]
  NotFound { kind: RecordKind, id: Uuid },

  #[error("access denied: role {} may not {action} {kind}", role_label(.role))]
  AccessDenied {
    role:   Option<Role>,
    kind:   RecordKind,
    action: Action,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Shorthand for a validation error on a single field.
  pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Validation(FieldErrors(vec![FieldError::new(field, message)]))
  }
}

fn role_label(role: &Option<Role>) -> &'static str {
  match role {
    Some(r) => r.into(),
    None => "<none>",
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
