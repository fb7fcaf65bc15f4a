//! [`AccessResolver`]: may this principal open this content item?
//!
//! The decision is the logical OR of every consulted source. A source that
//! fails contributes no signal; it can neither grant nor deny on its own. A
//! denial therefore only ever means "nobody said yes".
//!
//! There is no revocation path: a stale grant in any one source keeps
//! granting.

use std::sync::Arc;

use lectern_core::{
  content::{ContentId, ContentItem},
  entitlement::Entitlement,
  principal::Principal,
  store::{DurableStore, FallbackStore},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::entitlements::EntitlementStore;

// ─── Decision ────────────────────────────────────────────────────────────────

/// The answer rendered by the presentation layer. Denials carry a
/// human-readable reason and, where buying would help, `requires_purchase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessDecision {
  pub has_access:        bool,
  pub reason:            String,
  pub requires_purchase: bool,
  pub is_demo:           bool,
}

impl AccessDecision {
  fn grant(reason: impl Into<String>) -> Self {
    Self {
      has_access:        true,
      reason:            reason.into(),
      requires_purchase: false,
      is_demo:           false,
    }
  }

  fn demo() -> Self { Self { is_demo: true, ..Self::grant("Demo content") } }

  fn purchase_required(reason: impl Into<String>) -> Self {
    Self {
      has_access:        false,
      reason:            reason.into(),
      requires_purchase: true,
      is_demo:           false,
    }
  }
}

const PURCHASED: &str = "Purchased content";

/// Where a positive signal came from.
#[derive(Debug, Clone, Copy)]
enum Source {
  Entitlements,
  Hints,
  PrincipalRecord,
  Fallback,
}

// ─── Resolver ────────────────────────────────────────────────────────────────

pub struct AccessResolver<D, F> {
  entitlements: Arc<EntitlementStore<D, F>>,
}

impl<D, F> AccessResolver<D, F>
where
  D: DurableStore,
  F: FallbackStore,
{
  pub fn new(entitlements: Arc<EntitlementStore<D, F>>) -> Self {
    Self { entitlements }
  }

  /// Full resolution. Sources are awaited one at a time and the first
  /// positive answer wins:
  ///
  /// 1. the entitlement store (cache, then durable + fallback),
  /// 2. caller-supplied `hints`,
  /// 3. the principal's denormalized purchase list,
  /// 4. the fallback store on its own.
  pub async fn resolve(
    &self,
    principal: Option<&Principal>,
    content: &ContentItem,
    hints: &[Entitlement],
  ) -> AccessDecision {
    let principal = match gate(principal, content) {
      Ok(p) => p,
      Err(decision) => return decision,
    };

    let source = if self
      .entitlements
      .has_entitlement(&principal.id, &content.id)
      .await
    {
      Some(Source::Entitlements)
    } else if let Some(source) = resident_signal(principal, &content.id, hints) {
      Some(source)
    } else if self.fallback_grants(principal, &content.id).await {
      Some(Source::Fallback)
    } else {
      None
    };

    conclude(principal, content, source)
  }

  /// Resolution for callers that cannot await, such as render paths.
  ///
  /// Only already-resident data is consulted: cached entitlements, `hints`
  /// and the principal record. Right after a purchase, before the cache has
  /// been warmed for this principal, this may report no access even though
  /// [`AccessResolver::resolve`] would grant it.
  pub fn resolve_cached(
    &self,
    principal: Option<&Principal>,
    content: &ContentItem,
    hints: &[Entitlement],
  ) -> AccessDecision {
    let principal = match gate(principal, content) {
      Ok(p) => p,
      Err(decision) => return decision,
    };

    let cached = self
      .entitlements
      .cached_entitlements(&principal.id)
      .is_some_and(|list| list.iter().any(|e| e.grants(&content.id)));

    let source = if cached {
      Some(Source::Entitlements)
    } else {
      resident_signal(principal, &content.id, hints)
    };

    conclude(principal, content, source)
  }

  async fn fallback_grants(&self, principal: &Principal, content_id: &ContentId) -> bool {
    match self.entitlements.fallback_entitlements(&principal.id).await {
      Ok(list) => list.iter().any(|e| e.grants(content_id)),
      Err(e) => {
        warn!(principal = %principal.id, content = %content_id, error = %e, "fallback lookup failed");
        false
      }
    }
  }
}

/// The cases decided without consulting any purchase source. `Ok` hands back
/// the principal whose purchases must be checked.
fn gate<'p>(
  principal: Option<&'p Principal>,
  content: &ContentItem,
) -> Result<&'p Principal, AccessDecision> {
  if principal.is_some_and(Principal::is_admin) {
    return Err(AccessDecision::grant("Admin access"));
  }
  if content.demo {
    return Err(AccessDecision::demo());
  }
  if content.is_free() {
    return Err(AccessDecision::grant("Free content"));
  }
  principal.ok_or_else(|| AccessDecision::purchase_required("User not logged in"))
}

/// Hints, then the principal's own purchase list.
fn resident_signal(
  principal: &Principal,
  content_id: &ContentId,
  hints: &[Entitlement],
) -> Option<Source> {
  if hints.iter().any(|h| h.grants(content_id)) {
    Some(Source::Hints)
  } else if principal.purchased_content_ids.contains(content_id) {
    Some(Source::PrincipalRecord)
  } else {
    None
  }
}

fn conclude(
  principal: &Principal,
  content: &ContentItem,
  source: Option<Source>,
) -> AccessDecision {
  match source {
    Some(source) => {
      debug!(principal = %principal.id, content = %content.id, ?source, "access granted");
      AccessDecision::grant(PURCHASED)
    }
    None => {
      debug!(principal = %principal.id, content = %content.id, "access denied");
      AccessDecision::purchase_required(format!(
        "Purchase required - ${}",
        content.display_price()
      ))
    }
  }
}
