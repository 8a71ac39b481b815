//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use casebook_core::{FieldErrors, store::BackendError};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("unauthorized")]
  Unauthorized,

  /// The body is fixed so a denial reveals nothing about the record.
  #[error("forbidden")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0}")]
  Validation(FieldErrors),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Map a backend failure onto the status taxonomy, keeping the domain error
  /// it carries when there is one.
  pub fn store<E: BackendError>(e: E) -> Self {
    let mapped = match e.core() {
      Some(casebook_core::Error::Validation(fields)) => Some(ApiError::Validation(fields.clone())),
      Some(casebook_core::Error::NotFound { kind, id }) => {
        Some(ApiError::NotFound(format!("{kind} {id} not found")))
      }
      Some(casebook_core::Error::AccessDenied { .. }) => Some(ApiError::Forbidden),
      _ => None,
    };
    mapped.unwrap_or_else(|| ApiError::Store(Box::new(e)))
  }
}

impl From<casebook_core::Error> for ApiError {
  fn from(e: casebook_core::Error) -> Self {
    match e {
      casebook_core::Error::Validation(fields) => ApiError::Validation(fields),
      casebook_core::Error::NotFound { kind, id } => {
        ApiError::NotFound(format!("{kind} {id} not found"))
      }
      casebook_core::Error::AccessDenied { .. } => ApiError::Forbidden,
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message, fields) = match self {
      ApiError::Unauthorized => {
        let mut res = (
          StatusCode::UNAUTHORIZED,
          Json(json!({ "error": "unauthorized", "fields": [] })),
        )
          .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"casebook\""),
        );
        return res;
      }
      ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden".to_string(), FieldErrors::default()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m, FieldErrors::default()),
      ApiError::Validation(fields) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "validation failed".to_string(), fields)
      }
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string(), FieldErrors::default())
      }
    };
    (status, Json(json!({ "error": message, "fields": fields }))).into_response()
  }
}
