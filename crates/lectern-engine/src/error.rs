//! Error type for `lectern-engine`.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] lectern_core::Error),

  /// An entitlement or persistence source failed to answer. Callers that
  /// consult several sources treat this as "no signal".
  #[error("{source_name} unavailable: {source}")]
  SourceUnavailable {
    source_name: &'static str,
    #[source]
    source:      BoxError,
  },

  /// A secondary sink rejected a write that the primary sink accepted.
  #[error("write to {sink} not durable: {source}")]
  WriteNotDurable {
    sink:   &'static str,
    #[source]
    source: BoxError,
  },

  #[error("store error: {0}")]
  Store(#[source] BoxError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn unavailable<E>(source_name: &'static str, e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::SourceUnavailable { source_name, source: Box::new(e) }
  }

  pub(crate) fn not_durable<E>(sink: &'static str, e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::WriteNotDurable { sink, source: Box::new(e) }
  }

  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
