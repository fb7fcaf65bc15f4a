//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{StatusCode, header},
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unauthorized")]
  Unauthorized,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("{0}")]
  Internal(String),
}

impl From<lectern_core::Error> for ApiError {
  fn from(e: lectern_core::Error) -> Self {
    use lectern_core::Error as E;
    match e {
      E::Malformed(m) => ApiError::BadRequest(m),
      E::PaymentNotFound(id) => ApiError::NotFound(format!("payment {id} not found")),
      E::InvalidTransition { .. } => ApiError::Conflict(e.to_string()),
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl From<lectern_engine::Error> for ApiError {
  fn from(e: lectern_engine::Error) -> Self {
    match e {
      lectern_engine::Error::Core(core) => core.into(),
      other => ApiError::Store(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unauthorized => {
        return (
          StatusCode::UNAUTHORIZED,
          [(header::WWW_AUTHENTICATE, r#"Basic realm="lectern""#)],
          Json(json!({ "error": "unauthorized" })),
        )
          .into_response();
      }
      ApiError::Store(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m.clone()),
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
