//! Composition root for the Lectern server.
//!
//! Wires the storage backends, notification gateway and clock into the
//! engine services, starts the payment monitor and serves the JSON API under
//! `/api` until shutdown.

pub mod gateway;
pub mod settings;

use std::sync::Arc;

use anyhow::Context as _;
use axum::Router;
use lectern_api::{AppState, AuthConfig, api_router};
use lectern_core::{
  clock::{Clock, SystemClock},
  store::{DurableStore, FallbackStore},
};
use lectern_engine::{
  AccessResolver, EntitlementStore, MonitorConfig, PaymentMonitor,
  PendingRegistrationStore,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use gateway::LogGateway;
pub use settings::ServerConfig;

/// Build the services over `durable` and `fallback` and serve until
/// `shutdown` resolves.
pub async fn serve<D, F>(
  cfg: ServerConfig,
  durable: Arc<D>,
  fallback: Arc<F>,
  shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()>
where
  D: DurableStore + 'static,
  F: FallbackStore + 'static,
{
  let clock: Arc<dyn Clock> = Arc::new(SystemClock);
  let gateway = Arc::new(LogGateway::new(cfg.ops_email.clone()));

  let entitlements = Arc::new(EntitlementStore::new(
    durable.clone(),
    fallback,
    clock.clone(),
  ));
  let pending = Arc::new(PendingRegistrationStore::new(durable.clone(), clock.clone()));
  let monitor = Arc::new(PaymentMonitor::new(
    pending.clone(),
    durable.clone(),
    gateway.clone(),
    clock,
    MonitorConfig::from(&cfg.monitor),
  ));

  let state = AppState {
    durable,
    access: Arc::new(AccessResolver::new(entitlements.clone())),
    entitlements,
    pending,
    monitor: monitor.clone(),
    gateway,
    auth: Arc::new(AuthConfig {
      username:      cfg.admin_username.clone(),
      password_hash: cfg.admin_password_hash.clone(),
    }),
  };

  let app = Router::new()
    .nest("/api", api_router(state))
    .layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", cfg.host, cfg.port);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  monitor.start();
  tracing::info!("Listening on http://{address}");

  let served = axum::serve(listener, app)
    .with_graceful_shutdown(shutdown)
    .await
    .context("server error");

  monitor.stop();
  served
}
