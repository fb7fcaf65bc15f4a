//! Handler for `POST /access`.
//!
//! Body: `{"principalId":"alice","contentId":"masterclass"}`. Called by the
//! presentation backend, which has already authenticated the end user, so
//! the route requires admin credentials. `principalId` may be omitted for
//! anonymous visitors.
//!
//! The decision uses server-held sources only. The principal record and
//! content item come from the durable snapshot; a principal id with no
//! record is treated as a plain user with no denormalized purchases. The
//! body carries no entitlement hints.

use axum::{Json, extract::State};
use lectern_core::{
  content::ContentId,
  notify::NotificationGateway,
  principal::{Principal, PrincipalId},
  store::{DurableStore, FallbackStore},
};
use lectern_engine::AccessDecision;
use serde::Deserialize;

use crate::{AppState, auth::Admin, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessBody {
  pub principal_id: Option<PrincipalId>,
  pub content_id:   ContentId,
}

/// `POST /access`
pub async fn resolve<D, F, N>(
  _: Admin,
  State(state): State<AppState<D, F, N>>,
  Json(body): Json<AccessBody>,
) -> Result<Json<AccessDecision>, ApiError>
where
  D: DurableStore,
  F: FallbackStore,
  N: NotificationGateway,
{
  let snapshot = state
    .durable
    .load_snapshot()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  let content = snapshot
    .content_item(&body.content_id)
    .cloned()
    .ok_or_else(|| ApiError::NotFound(format!("content {} not found", body.content_id)))?;

  let principal = body.principal_id.map(|id| {
    snapshot
      .user(&id)
      .cloned()
      .unwrap_or_else(|| Principal::user(id))
  });

  let decision = state
    .access
    .resolve(principal.as_ref(), &content, &[])
    .await;
  Ok(Json(decision))
}
