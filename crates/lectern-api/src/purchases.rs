//! Handlers for entitlement endpoints. All require admin credentials.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/purchases` | Body: [`PurchaseBody`]; returns 201 |
//! | `GET`  | `/principals/{id}/entitlements` | Merged durable + fallback view |
//! | `POST` | `/cache/clear` | Drops every cached entitlement list |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use lectern_core::{
  content::ContentId,
  entitlement::Entitlement,
  notify::{NotificationGateway, TransactionalKind},
  principal::PrincipalId,
  store::{DurableStore, FallbackStore},
};
use serde::Deserialize;
use serde_json::json;

use crate::{AppState, auth::Admin, error::ApiError};

// ─── Record ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseBody {
  pub principal_id: PrincipalId,
  pub content_id:   ContentId,
  pub amount:       f64,
  /// Where to send the purchase confirmation, if anywhere.
  pub email:        Option<String>,
}

/// `POST /purchases`
pub async fn record<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Json(body): Json<PurchaseBody>,
) -> Result<impl IntoResponse, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  if !body.amount.is_finite() || body.amount < 0.0 {
    return Err(ApiError::BadRequest(format!("invalid amount {}", body.amount)));
  }

  let recorded = state
    .entitlements
    .record_purchase(&body.principal_id, &body.content_id, body.amount)
    .await;
  if !recorded {
    return Err(ApiError::Internal("purchase could not be recorded".to_string()));
  }

  if let Some(email) = body.email.as_deref() {
    state
      .notify(
        TransactionalKind::PurchaseConfirmation,
        email,
        json!({
          "principalId": body.principal_id,
          "contentId": body.content_id,
          "amount": body.amount,
        }),
      )
      .await;
  }

  Ok((StatusCode::CREATED, Json(json!({ "recorded": true }))))
}

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /principals/{id}/entitlements`
pub async fn list_for_principal<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Path(id): Path<PrincipalId>,
) -> Json<Vec<Entitlement>>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  Json(state.entitlements.get_entitlements(&id).await)
}

// ─── Cache ────────────────────────────────────────────────────────────────────

/// `POST /cache/clear`
pub async fn clear_cache<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
) -> StatusCode
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  state.entitlements.clear_cache();
  StatusCode::NO_CONTENT
}
