//! Persistence traits: the [`DurableStore`] snapshot sink and the
//! [`FallbackStore`] key/value sink.
//!
//! The traits are implemented by storage backends (e.g.
//! `lectern-store-sqlite`, or [`crate::memory`] for tests). Higher layers
//! depend on these abstractions, not on any concrete backend. The two sinks
//! are independent; nothing links their contents.

use std::future::Future;

use crate::{principal::PrincipalId, snapshot::Snapshot};

/// Whole-document read-modify-write persistence.
///
/// There is no partial-update or transactional API: two writers that load,
/// modify, and save concurrently will clobber each other (last writer wins).
pub trait DurableStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Load the current snapshot. An empty store yields
  /// [`Snapshot::default`].
  fn load_snapshot(
    &self,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Replace the stored snapshot wholesale.
  fn save_snapshot(
    &self,
    snapshot: Snapshot,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Simple key/value persistence, used as a secondary entitlement sink.
pub trait FallbackStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Vec<u8>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Keys beginning with `prefix`, in ascending order.
  fn list<'a>(
    &'a self,
    prefix: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}

/// Fallback key holding the JSON entitlement list for `principal_id`.
pub fn purchases_key(principal_id: &PrincipalId) -> String {
  format!("purchases:{principal_id}")
}
