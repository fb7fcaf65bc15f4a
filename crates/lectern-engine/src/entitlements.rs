//! [`EntitlementStore`]: records and answers "what has this principal
//! bought?".
//!
//! A purchase is written to three sinks: the durable snapshot (primary), the
//! fallback key/value store, and the denormalized `purchased_content_ids` on
//! the principal record. Only the primary write decides success. The other
//! two are best-effort, so a partial failure leaves the sinks disagreeing
//! until the next successful write. Reads union the durable and fallback
//! sinks.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
};

use lectern_core::{
  clock::Clock,
  content::ContentId,
  entitlement::{Entitlement, decode_list, merge_latest, remove_pair},
  principal::PrincipalId,
  store::{DurableStore, FallbackStore, purchases_key},
};
use tracing::{debug, error, warn};

use crate::{Error, Result};

pub struct EntitlementStore<D, F> {
  durable:  Arc<D>,
  fallback: Arc<F>,
  clock:    Arc<dyn Clock>,
  /// Per-principal merged entitlement lists. No expiry; see
  /// [`EntitlementStore::clear_cache`].
  cache:    RwLock<HashMap<PrincipalId, Vec<Entitlement>>>,
}

impl<D, F> EntitlementStore<D, F>
where
  D: DurableStore,
  F: FallbackStore,
{
  pub fn new(durable: Arc<D>, fallback: Arc<F>, clock: Arc<dyn Clock>) -> Self {
    Self { durable, fallback, clock, cache: RwLock::new(HashMap::new()) }
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Record a completed purchase of `content_id` by `principal_id`.
  ///
  /// Returns `false` only when the durable write fails, in which case no
  /// other sink is touched. Fallback and principal-record failures are
  /// logged and do not change the result.
  pub async fn record_purchase(
    &self,
    principal_id: &PrincipalId,
    content_id: &ContentId,
    amount: f64,
  ) -> bool {
    let entitlement = Entitlement::completed(
      principal_id.clone(),
      content_id.clone(),
      amount,
      self.clock.now(),
    );

    let durable_list = match self.write_durable(&entitlement).await {
      Ok(list) => list,
      Err(e) => {
        error!(
          principal = %principal_id,
          content = %content_id,
          error = %e,
          "failed to record purchase"
        );
        return false;
      }
    };

    let fallback_list = match self.write_fallback(&entitlement).await {
      Ok(list) => Some(list),
      Err(e) => {
        warn!(principal = %principal_id, content = %content_id, error = %e, "purchase not mirrored");
        None
      }
    };

    if let Err(e) = self.write_principal_record(principal_id, content_id).await {
      warn!(principal = %principal_id, content = %content_id, error = %e, "purchase list not updated");
    }

    // Without the fallback's view the merge would be partial; the next read
    // repopulates the entry instead.
    let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
    match fallback_list {
      Some(fallback_list) => {
        cache.insert(principal_id.clone(), merge_latest([durable_list, fallback_list]));
      }
      None => {
        cache.remove(principal_id);
      }
    }
    drop(cache);

    debug!(principal = %principal_id, content = %content_id, amount, "purchase recorded");
    true
  }

  /// Replace any record of the pair in the snapshot and append the new one.
  /// Returns the principal's records as written.
  async fn write_durable(&self, entitlement: &Entitlement) -> Result<Vec<Entitlement>> {
    let mut snapshot =
      self.durable.load_snapshot().await.map_err(Error::store)?;
    for content_id in &entitlement.content_ids {
      remove_pair(&mut snapshot.entitlements, &entitlement.principal_id, content_id);
    }
    snapshot.entitlements.push(entitlement.clone());
    let list = snapshot.entitlements_for(&entitlement.principal_id);

    self.durable.save_snapshot(snapshot).await.map_err(Error::store)?;
    Ok(list)
  }

  async fn write_fallback(&self, entitlement: &Entitlement) -> Result<Vec<Entitlement>> {
    let mut list = self
      .fallback_entitlements(&entitlement.principal_id)
      .await
      .map_err(|e| match e {
        Error::SourceUnavailable { source, .. } => {
          Error::WriteNotDurable { sink: "fallback store", source }
        }
        other => other,
      })?;
    for content_id in &entitlement.content_ids {
      remove_pair(&mut list, &entitlement.principal_id, content_id);
    }
    list.push(entitlement.clone());

    let bytes = serde_json::to_vec(&list)?;
    self
      .fallback
      .set(&purchases_key(&entitlement.principal_id), bytes)
      .await
      .map_err(|e| Error::not_durable("fallback store", e))?;
    Ok(list)
  }

  async fn write_principal_record(
    &self,
    principal_id: &PrincipalId,
    content_id: &ContentId,
  ) -> Result<()> {
    let mut snapshot = self
      .durable
      .load_snapshot()
      .await
      .map_err(|e| Error::not_durable("principal record", e))?;

    let Some(user) = snapshot.user_mut(principal_id) else {
      debug!(principal = %principal_id, "no principal record to update");
      return Ok(());
    };
    if !user.purchased_content_ids.insert(content_id.clone()) {
      return Ok(());
    }

    self
      .durable
      .save_snapshot(snapshot)
      .await
      .map_err(|e| Error::not_durable("principal record", e))
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All entitlement records for `principal_id`, any status.
  ///
  /// Never fails: a source that cannot answer contributes nothing. Results
  /// are cached only when both sources answered, so a transient outage does
  /// not pin a partial list in the cache.
  pub async fn get_entitlements(&self, principal_id: &PrincipalId) -> Vec<Entitlement> {
    if let Some(hit) = self.cached_entitlements(principal_id) {
      return hit;
    }

    let mut complete = true;

    let durable = match self.durable.load_snapshot().await {
      Ok(snapshot) => snapshot.entitlements_for(principal_id),
      Err(e) => {
        warn!(principal = %principal_id, error = %e, "durable entitlements unavailable");
        complete = false;
        Vec::new()
      }
    };

    let fallback = match self.fallback_entitlements(principal_id).await {
      Ok(list) => list,
      Err(e) => {
        warn!(principal = %principal_id, error = %e, "fallback entitlements unavailable");
        complete = false;
        Vec::new()
      }
    };

    let merged = merge_latest([durable, fallback]);
    if complete {
      self
        .cache
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(principal_id.clone(), merged.clone());
    }
    merged
  }

  /// Whether any completed record covers `content_id`.
  pub async fn has_entitlement(
    &self,
    principal_id: &PrincipalId,
    content_id: &ContentId,
  ) -> bool {
    self
      .get_entitlements(principal_id)
      .await
      .iter()
      .any(|e| e.grants(content_id))
  }

  /// The cached list, without any I/O.
  pub fn cached_entitlements(&self, principal_id: &PrincipalId) -> Option<Vec<Entitlement>> {
    self
      .cache
      .read()
      .unwrap_or_else(|e| e.into_inner())
      .get(principal_id)
      .cloned()
  }

  /// Read the principal's list from the fallback store alone. Records that
  /// do not parse are skipped; only an unreadable list is an error.
  pub async fn fallback_entitlements(
    &self,
    principal_id: &PrincipalId,
  ) -> Result<Vec<Entitlement>> {
    let bytes = self
      .fallback
      .get(&purchases_key(principal_id))
      .await
      .map_err(|e| Error::unavailable("fallback store", e))?;

    match bytes {
      None => Ok(Vec::new()),
      Some(bytes) => serde_json::from_slice::<Vec<serde_json::Value>>(&bytes)
        .map(decode_list)
        .map_err(|e| Error::unavailable("fallback store", e)),
    }
  }

  /// Drop every cached list.
  pub fn clear_cache(&self) {
    self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
  }
}
