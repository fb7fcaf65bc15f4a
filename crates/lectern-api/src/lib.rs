//! JSON REST API for Lectern.
//!
//! Exposes an axum [`Router`] over the entitlement and payment-monitoring
//! services. Every route except the checkout hooks requires HTTP Basic
//! credentials (see [`auth`]). TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", lectern_api::api_router(state))
//! ```

pub mod access;
pub mod auth;
pub mod checkout;
pub mod error;
pub mod payments;
pub mod purchases;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use lectern_core::{
  notify::{NotificationGateway, TransactionalKind},
  store::{DurableStore, FallbackStore},
};
use lectern_engine::{
  AccessResolver, EntitlementStore, PaymentMonitor, PendingRegistrationStore,
};
use tracing::{debug, warn};

pub use auth::AuthConfig;
pub use error::ApiError;

/// Upper bound on a transactional send made while answering a request.
const TRANSACTIONAL_TIMEOUT: Duration = Duration::from_secs(10);

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<D, F, N> {
  pub durable:      Arc<D>,
  pub entitlements: Arc<EntitlementStore<D, F>>,
  pub access:       Arc<AccessResolver<D, F>>,
  pub pending:      Arc<PendingRegistrationStore<D>>,
  pub monitor:      Arc<PaymentMonitor<D, N>>,
  pub gateway:      Arc<N>,
  pub auth:         Arc<AuthConfig>,
}

// Derived `Clone` would demand `D: Clone` and friends.
impl<D, F, N> Clone for AppState<D, F, N> {
  fn clone(&self) -> Self {
    Self {
      durable:      Arc::clone(&self.durable),
      entitlements: Arc::clone(&self.entitlements),
      access:       Arc::clone(&self.access),
      pending:      Arc::clone(&self.pending),
      monitor:      Arc::clone(&self.monitor),
      gateway:      Arc::clone(&self.gateway),
      auth:         Arc::clone(&self.auth),
    }
  }
}

impl<D, F, N> AppState<D, F, N>
where
  N: NotificationGateway,
{
  /// Best-effort transactional message. Failures are logged, never returned.
  pub(crate) async fn notify(
    &self,
    kind: TransactionalKind,
    recipient: &str,
    template_data: serde_json::Value,
  ) {
    let send = self.gateway.send_transactional(kind, recipient, template_data);
    match tokio::time::timeout(TRANSACTIONAL_TIMEOUT, send).await {
      Ok(Ok(true)) => debug!(?kind, recipient, "transactional message sent"),
      Ok(Ok(false)) => warn!(?kind, recipient, "transactional message declined"),
      Ok(Err(e)) => warn!(?kind, recipient, error = %e, "transactional message failed"),
      Err(_) => warn!(?kind, recipient, "transactional message timed out"),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<D, F, N>(state: AppState<D, F, N>) -> Router<()>
where
  D: DurableStore + 'static,
  F: FallbackStore + 'static,
  N: NotificationGateway + 'static,
{
  Router::new()
    // Access checks
    .route("/access", post(access::resolve::<D, F, N>))
    // Checkout hooks (public)
    .route("/checkout/pending", post(checkout::create::<D, F, N>))
    .route("/registration/{token}", get(checkout::by_token::<D, F, N>))
    // Entitlements
    .route("/purchases", post(purchases::record::<D, F, N>))
    .route(
      "/principals/{id}/entitlements",
      get(purchases::list_for_principal::<D, F, N>),
    )
    .route("/cache/clear", post(purchases::clear_cache::<D, F, N>))
    // Payments
    .route("/payments/pending", get(payments::list_pending::<D, F, N>))
    .route("/payments/{id}/complete", post(payments::complete::<D, F, N>))
    .route("/payments/{id}/expire", post(payments::expire::<D, F, N>))
    .route("/payments/overdue", get(payments::overdue::<D, F, N>))
    .route("/payments/alerts", get(payments::alerts::<D, F, N>))
    .route("/payments/stats", get(payments::stats::<D, F, N>))
    .route("/payments/reminders", post(payments::remind::<D, F, N>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
