//! Handlers for `/payments` endpoints. All require admin credentials.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/payments/pending` | Optional `?email=`; pending payments only |
//! | `POST` | `/payments/{id}/complete` | Sends a `welcome` message; 409 if expired |
//! | `POST` | `/payments/{id}/expire` | 409 if completed |
//! | `GET`  | `/payments/overdue` | Oldest first, with elapsed hours |
//! | `GET`  | `/payments/alerts` | Ledger, newest first |
//! | `GET`  | `/payments/stats` | Bucket counts |
//! | `POST` | `/payments/reminders` | Body: [`ReminderBody`]; manual reminder |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use lectern_core::{
  notify::{NotificationGateway, TransactionalKind},
  payment::{PaymentAlert, PaymentItem, PendingPayment},
  store::{DurableStore, FallbackStore},
};
use lectern_engine::{PaymentStats, monitor::OverduePayment};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{AppState, auth::Admin, error::ApiError};

// ─── Pending ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingParams {
  pub email: Option<String>,
}

/// `GET /payments/pending[?email=<email>]`
pub async fn list_pending<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Query(params): Query<PendingParams>,
) -> Result<Json<Vec<PendingPayment>>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let payments = match params.email.as_deref() {
    Some(email) => state.pending.get_by_email(email).await?,
    None => state.pending.list_all_pending().await?,
  };
  Ok(Json(payments))
}

// ─── Transitions ──────────────────────────────────────────────────────────────

/// `POST /payments/{id}/complete`: the buyer registered.
pub async fn complete<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PendingPayment>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let payment = state.pending.complete(id).await?;
  state
    .notify(
      TransactionalKind::Welcome,
      &payment.email,
      json!({ "items": payment.items, "total": payment.total }),
    )
    .await;
  Ok(Json(payment))
}

/// `POST /payments/{id}/expire`
pub async fn expire<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PendingPayment>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  Ok(Json(state.pending.expire(id).await?))
}

// ─── Monitoring ───────────────────────────────────────────────────────────────

/// `GET /payments/overdue`
pub async fn overdue<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
) -> Result<Json<Vec<OverduePayment>>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  Ok(Json(state.monitor.list_overdue().await?))
}

/// `GET /payments/alerts`
pub async fn alerts<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
) -> Result<Json<Vec<PaymentAlert>>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  Ok(Json(state.monitor.list_alert_history().await?))
}

/// `GET /payments/stats`
pub async fn stats<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
) -> Result<Json<PaymentStats>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  Ok(Json(state.monitor.compute_stats().await?))
}

// ─── Manual reminder ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderBody {
  pub email:              String,
  pub registration_token: String,
  pub items:              Vec<PaymentItem>,
  pub total:              f64,
}

/// `POST /payments/reminders`: returns `{"sent": bool}`.
pub async fn remind<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Json(body): Json<ReminderBody>,
) -> Json<Value>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let sent = state
    .monitor
    .send_manual_reminder(&body.email, &body.registration_token, body.items, body.total)
    .await;
  Json(json!({ "sent": sent }))
}
