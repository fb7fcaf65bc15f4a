//! In-memory backends for [`DurableStore`] and [`FallbackStore`].
//!
//! Used by tests and by the server's `--in-memory` mode. Both can be told to
//! fail, which is how the degrade-per-source paths get exercised.
//!
//! Cloning is cheap; clones share state.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use crate::{
  Error, Result,
  snapshot::Snapshot,
  store::{DurableStore, FallbackStore},
};

// ─── Durable ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryDurableStore {
  snapshot:   Arc<Mutex<Snapshot>>,
  fail_loads: Arc<AtomicBool>,
  fail_saves: Arc<AtomicBool>,
}

impl MemoryDurableStore {
  pub fn new() -> Self { Self::default() }

  pub fn with_snapshot(snapshot: Snapshot) -> Self {
    Self { snapshot: Arc::new(Mutex::new(snapshot)), ..Self::default() }
  }

  /// Make every subsequent `load_snapshot` fail (or succeed again).
  pub fn fail_loads(&self, fail: bool) {
    self.fail_loads.store(fail, Ordering::SeqCst);
  }

  /// Make every subsequent `save_snapshot` fail (or succeed again).
  pub fn fail_saves(&self, fail: bool) {
    self.fail_saves.store(fail, Ordering::SeqCst);
  }

  /// Current contents, bypassing failure injection.
  pub fn peek(&self) -> Snapshot {
    self.snapshot.lock().unwrap_or_else(|e| e.into_inner()).clone()
  }
}

impl DurableStore for MemoryDurableStore {
  type Error = Error;

  async fn load_snapshot(&self) -> Result<Snapshot> {
    if self.fail_loads.load(Ordering::SeqCst) {
      return Err(Error::Unavailable("durable store load".into()));
    }
    Ok(self.peek())
  }

  async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
    if self.fail_saves.load(Ordering::SeqCst) {
      return Err(Error::Unavailable("durable store save".into()));
    }
    *self.snapshot.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
    Ok(())
  }
}

// ─── Fallback ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryFallbackStore {
  entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
  fail:    Arc<AtomicBool>,
}

impl MemoryFallbackStore {
  pub fn new() -> Self { Self::default() }

  /// Make every subsequent call fail (or succeed again).
  pub fn fail(&self, fail: bool) { self.fail.store(fail, Ordering::SeqCst); }

  fn check(&self) -> Result<()> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(Error::Unavailable("fallback store".into()));
    }
    Ok(())
  }
}

impl FallbackStore for MemoryFallbackStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
    self.check()?;
    let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    Ok(entries.get(key).cloned())
  }

  async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
    self.check()?;
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.insert(key.to_owned(), value);
    Ok(())
  }

  async fn list(&self, prefix: &str) -> Result<Vec<String>> {
    self.check()?;
    let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    Ok(
      entries
        .keys()
        .filter(|k| k.starts_with(prefix))
        .cloned()
        .collect(),
    )
  }
}
