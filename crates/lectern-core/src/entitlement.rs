//! Entitlements: durable records that a principal paid for content.
//!
//! Historical records come in two shapes: a singular `contentId` and a list
//! `contentIds`. Both are folded into one `content_ids` set when a record is
//! deserialized, so everything past this module sees a single shape. Lists of
//! records are decoded one element at a time: a malformed record is skipped
//! with a warning rather than failing the whole list.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{content::ContentId, principal::PrincipalId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntitlementStatus {
  Pending,
  Completed,
}

/// A purchase record. Only `Completed` records grant access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawEntitlement")]
pub struct Entitlement {
  pub id:           Uuid,
  pub principal_id: PrincipalId,
  pub content_ids:  BTreeSet<ContentId>,
  pub amount:       f64,
  pub status:       EntitlementStatus,
  pub created_at:   DateTime<Utc>,
}

impl Entitlement {
  /// A completed single-item purchase.
  pub fn completed(
    principal_id: PrincipalId,
    content_id: ContentId,
    amount: f64,
    created_at: DateTime<Utc>,
  ) -> Self {
    Self {
      id: Uuid::new_v4(),
      principal_id,
      content_ids: BTreeSet::from([content_id]),
      amount,
      status: EntitlementStatus::Completed,
      created_at,
    }
  }

  pub fn is_completed(&self) -> bool {
    self.status == EntitlementStatus::Completed
  }

  pub fn covers(&self, content_id: &ContentId) -> bool {
    self.content_ids.contains(content_id)
  }

  /// Whether this record, on its own, grants access to `content_id`.
  pub fn grants(&self, content_id: &ContentId) -> bool {
    self.is_completed() && self.covers(content_id)
  }
}

/// Wire shape accepting both legacy content references.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEntitlement {
  id:           Uuid,
  #[serde(alias = "userId")]
  principal_id: PrincipalId,
  #[serde(default, alias = "videoId")]
  content_id:   Option<ContentId>,
  #[serde(default, alias = "videoIds")]
  content_ids:  Option<Vec<ContentId>>,
  #[serde(default)]
  amount:       f64,
  status:       EntitlementStatus,
  created_at:   DateTime<Utc>,
}

impl From<RawEntitlement> for Entitlement {
  fn from(raw: RawEntitlement) -> Self {
    let mut content_ids: BTreeSet<ContentId> =
      raw.content_ids.unwrap_or_default().into_iter().collect();
    content_ids.extend(raw.content_id);

    Self {
      id: raw.id,
      principal_id: raw.principal_id,
      content_ids,
      amount: raw.amount,
      status: raw.status,
      created_at: raw.created_at,
    }
  }
}

/// Decode each element of `values`, skipping records that do not parse.
pub fn decode_list(values: Vec<serde_json::Value>) -> Vec<Entitlement> {
  values
    .into_iter()
    .filter_map(|value| match serde_json::from_value(value) {
      Ok(entitlement) => Some(entitlement),
      Err(e) => {
        warn!(error = %e, "skipping malformed entitlement record");
        None
      }
    })
    .collect()
}

/// `deserialize_with` adapter for entitlement lists embedded in documents.
pub(crate) fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<Entitlement>, D::Error>
where
  D: Deserializer<'de>,
{
  Vec::<serde_json::Value>::deserialize(deserializer).map(decode_list)
}

/// Union `lists` in order, keeping one record per content set. A later record
/// with the same content set replaces the earlier one in place.
pub fn merge_latest<I>(lists: I) -> Vec<Entitlement>
where
  I: IntoIterator<Item = Vec<Entitlement>>,
{
  let mut merged: Vec<Entitlement> = Vec::new();
  for entitlement in lists.into_iter().flatten() {
    match merged
      .iter_mut()
      .find(|e| e.content_ids == entitlement.content_ids)
    {
      Some(slot) => *slot = entitlement,
      None => merged.push(entitlement),
    }
  }
  merged
}

/// Remove `content_id` for `principal_id` from `entitlements`. Multi-item
/// records lose just that id; records left empty are dropped.
pub fn remove_pair(
  entitlements: &mut Vec<Entitlement>,
  principal_id: &PrincipalId,
  content_id: &ContentId,
) {
  for e in entitlements.iter_mut() {
    if &e.principal_id == principal_id {
      e.content_ids.remove(content_id);
    }
  }
  entitlements.retain(|e| !e.content_ids.is_empty());
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn from_json(v: serde_json::Value) -> Entitlement {
    serde_json::from_value(v).expect("entitlement json")
  }

  #[test]
  fn singular_and_list_shapes_normalize_identically() {
    let id = Uuid::new_v4();
    let singular = from_json(json!({
      "id": id,
      "principalId": "u1",
      "contentId": "c1",
      "amount": 10.0,
      "status": "completed",
      "createdAt": "2024-01-01T00:00:00Z",
    }));
    let list = from_json(json!({
      "id": id,
      "principalId": "u1",
      "contentIds": ["c1"],
      "amount": 10.0,
      "status": "completed",
      "createdAt": "2024-01-01T00:00:00Z",
    }));

    assert_eq!(singular, list);
    assert!(singular.grants(&ContentId::from("c1")));
  }

  #[test]
  fn legacy_aliases_are_accepted() {
    let e = from_json(json!({
      "id": Uuid::new_v4(),
      "userId": "u1",
      "videoId": "c9",
      "status": "completed",
      "createdAt": "2024-01-01T00:00:00Z",
    }));
    assert_eq!(e.principal_id, PrincipalId::from("u1"));
    assert!(e.covers(&ContentId::from("c9")));
    assert_eq!(e.amount, 0.0);
  }

  #[test]
  fn serializes_in_normalized_shape() {
    let e = Entitlement::completed("u1".into(), "c1".into(), 5.0, Utc::now());
    let v = serde_json::to_value(&e).unwrap();
    assert_eq!(v["contentIds"], json!(["c1"]));
    assert!(v.get("contentId").is_none());

    let back: Entitlement = serde_json::from_value(v).unwrap();
    assert_eq!(back, e);
  }

  #[test]
  fn pending_records_do_not_grant() {
    let mut e = Entitlement::completed("u1".into(), "c1".into(), 5.0, Utc::now());
    e.status = EntitlementStatus::Pending;
    assert!(!e.grants(&ContentId::from("c1")));
  }

  #[test]
  fn merge_latest_keeps_last_seen_per_content_set() {
    let first = Entitlement::completed("u1".into(), "c1".into(), 5.0, Utc::now());
    let other = Entitlement::completed("u1".into(), "c2".into(), 7.0, Utc::now());
    let newer = Entitlement::completed("u1".into(), "c1".into(), 9.0, Utc::now());

    let merged = merge_latest([vec![first, other.clone()], vec![newer.clone()]]);
    assert_eq!(merged, vec![newer, other]);
  }

  #[test]
  fn remove_pair_strips_from_multi_item_records() {
    let now = Utc::now();
    let mut multi = Entitlement::completed("u1".into(), "c1".into(), 5.0, now);
    multi.content_ids.insert("c2".into());
    let single = Entitlement::completed("u1".into(), "c1".into(), 5.0, now);
    let someone_else = Entitlement::completed("u2".into(), "c1".into(), 5.0, now);

    let mut all = vec![multi, single, someone_else.clone()];
    remove_pair(&mut all, &"u1".into(), &"c1".into());

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].content_ids, BTreeSet::from([ContentId::from("c2")]));
    assert_eq!(all[1], someone_else);
  }
}
