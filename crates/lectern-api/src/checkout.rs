//! Handlers for the checkout hooks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/checkout/pending` | Body: [`CheckoutBody`]; returns 201 + pending payment |
//! | `GET`  | `/registration/{token}` | 404 if no payment carries the token |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  notify::{NotificationGateway, TransactionalKind},
  payment::{PaymentItem, PendingPayment},
  store::{DurableStore, FallbackStore},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, error::ApiError};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
  pub email: String,
  pub items: Vec<PaymentItem>,
  pub total: f64,
}

/// `POST /checkout/pending`: a buyer paid without an account.
///
/// Sends a `registration_invite` carrying the registration token.
pub async fn create<D, F, N>(
  State(state): State<AppState<D, F, N>>,
  Json(body): Json<CheckoutBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let payment = state
    .pending
    .store(&body.email, body.items, body.total)
    .await?;

  state
    .notify(
      TransactionalKind::RegistrationInvite,
      &payment.email,
      json!({
        "registrationToken": payment.registration_token,
        "items": payment.items,
        "total": payment.total,
      }),
    )
    .await;

  Ok((StatusCode::CREATED, Json(payment)))
}

// ─── Lookup ───────────────────────────────────────────────────────────────────

/// `GET /registration/{token}`
pub async fn by_token<D, F, N>(
  State(state): State<AppState<D, F, N>>,
  Path(token): Path<String>,
) -> Result<Json<PendingPayment>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let payment = state
    .pending
    .get_by_token(&token)
    .await?
    .ok_or_else(|| ApiError::NotFound("registration token not found".to_string()))?;
  Ok(Json(payment))
}
