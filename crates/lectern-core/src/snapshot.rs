//! The whole-document snapshot exchanged with a [`DurableStore`].
//!
//! [`DurableStore`]: crate::store::DurableStore

use serde::{Deserialize, Serialize};

use crate::{
  content::{ContentId, ContentItem},
  entitlement::Entitlement,
  payment::{PaymentAlert, PendingPayment},
  principal::{Principal, PrincipalId},
};

/// Everything the durable store holds. Missing collections deserialize as
/// empty so older documents still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
  pub users:            Vec<Principal>,
  pub content:          Vec<ContentItem>,
  #[serde(deserialize_with = "crate::entitlement::deserialize_list")]
  pub entitlements:     Vec<Entitlement>,
  pub pending_payments: Vec<PendingPayment>,
  pub payment_alerts:   Vec<PaymentAlert>,
}

impl Snapshot {
  pub fn user(&self, id: &PrincipalId) -> Option<&Principal> {
    self.users.iter().find(|u| &u.id == id)
  }

  pub fn user_mut(&mut self, id: &PrincipalId) -> Option<&mut Principal> {
    self.users.iter_mut().find(|u| &u.id == id)
  }

  pub fn content_item(&self, id: &ContentId) -> Option<&ContentItem> {
    self.content.iter().find(|c| &c.id == id)
  }

  /// All entitlement records belonging to `principal_id`, any status.
  pub fn entitlements_for(&self, principal_id: &PrincipalId) -> Vec<Entitlement> {
    self
      .entitlements
      .iter()
      .filter(|e| &e.principal_id == principal_id)
      .cloned()
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_collections_default_to_empty() {
    let snap: Snapshot =
      serde_json::from_str(r#"{"users":[{"id":"u1"}]}"#).unwrap();
    assert_eq!(snap.users.len(), 1);
    assert!(snap.entitlements.is_empty());
    assert!(snap.payment_alerts.is_empty());
    assert!(snap.user(&"u1".into()).is_some_and(|u| !u.is_admin()));
  }

  #[test]
  fn malformed_entitlement_is_skipped_not_fatal() {
    let snap: Snapshot = serde_json::from_value(serde_json::json!({
      "entitlements": [
        {
          "id": uuid::Uuid::new_v4(),
          "principalId": "u1",
          "contentId": "c1",
          "status": "completed",
          "createdAt": "2024-03-01T12:00:00Z",
        },
        { "principalId": "u1", "status": "refunded" },
      ],
    }))
    .unwrap();

    assert_eq!(snap.entitlements.len(), 1);
    assert!(snap.entitlements[0].grants(&"c1".into()));
  }
}
