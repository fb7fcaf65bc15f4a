//! Principals: the actors that ask for content.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::content::ContentId;

/// Opaque principal identifier, as issued by the (external) auth layer.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrincipalId(pub String);

impl PrincipalId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PrincipalId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for PrincipalId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for PrincipalId {
  fn from(s: String) -> Self { Self(s) }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  User,
}

/// A user record as stored in the durable snapshot.
///
/// `purchased_content_ids` is a denormalized copy of the principal's
/// entitlements. It is written best-effort and may lag the entitlement
/// records themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
  pub id:                    PrincipalId,
  #[serde(default)]
  pub role:                  Role,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email:                 Option<String>,
  #[serde(default)]
  pub purchased_content_ids: BTreeSet<ContentId>,
}

impl Principal {
  /// A plain user with no purchases.
  pub fn user(id: impl Into<PrincipalId>) -> Self {
    Self {
      id:                    id.into(),
      role:                  Role::User,
      email:                 None,
      purchased_content_ids: BTreeSet::new(),
    }
  }

  pub fn admin(id: impl Into<PrincipalId>) -> Self {
    Self { role: Role::Admin, ..Self::user(id) }
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}
