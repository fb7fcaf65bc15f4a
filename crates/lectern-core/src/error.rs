//! Error types for `lectern-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::payment::PaymentStatus;

#[derive(Debug, Error)]
pub enum Error {
  /// Input rejected at a boundary before reaching core logic.
  #[error("malformed input: {0}")]
  Malformed(String),

  #[error("pending payment not found: {0}")]
  PaymentNotFound(Uuid),

  #[error("pending payment {id} cannot move from {from} to {to}")]
  InvalidTransition {
    id:   Uuid,
    from: PaymentStatus,
    to:   PaymentStatus,
  },

  /// A backing source could not answer (used by the in-memory backends).
  #[error("source unavailable: {0}")]
  Unavailable(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
