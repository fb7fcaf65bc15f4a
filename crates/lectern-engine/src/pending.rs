//! [`PendingRegistrationStore`]: payments taken before the buyer finished
//! registering.
//!
//! Records are appended to the durable snapshot and never removed; their
//! status only moves forward out of `pending`.

use std::sync::Arc;

use lectern_core::{
  clock::Clock,
  payment::{PaymentItem, PaymentStatus, PendingPayment, normalize_email},
  snapshot::Snapshot,
  store::DurableStore,
};
use rand_core::{OsRng, RngCore};
use tracing::info;
use uuid::Uuid;

use crate::{Error, Result};

pub struct PendingRegistrationStore<D> {
  durable: Arc<D>,
  clock:   Arc<dyn Clock>,
}

impl<D: DurableStore> PendingRegistrationStore<D> {
  pub fn new(durable: Arc<D>, clock: Arc<dyn Clock>) -> Self {
    Self { durable, clock }
  }

  /// Record a payment for `email` and issue its registration token.
  pub async fn store(
    &self,
    email: &str,
    items: Vec<PaymentItem>,
    total: f64,
  ) -> Result<PendingPayment> {
    let email = normalize_email(email)?;
    if items.is_empty() {
      return Err(malformed("a pending payment needs at least one item"));
    }
    if !total.is_finite() || total < 0.0 {
      return Err(malformed(format!("total {total} is not a valid amount")));
    }

    let payment = PendingPayment {
      id: Uuid::new_v4(),
      email,
      items,
      total,
      payment_date: self.clock.now(),
      status: PaymentStatus::Pending,
      registration_token: registration_token(),
      completed_at: None,
    };

    let mut snapshot = self.load().await?;
    snapshot.pending_payments.push(payment.clone());
    self.save(snapshot).await?;

    info!(payment = %payment.id, email = %payment.email, total, "pending payment stored");
    Ok(payment)
  }

  /// Pending payments for `email` (compared after normalization).
  pub async fn get_by_email(&self, email: &str) -> Result<Vec<PendingPayment>> {
    let email = normalize_email(email)?;
    Ok(
      self
        .list_all_pending()
        .await?
        .into_iter()
        .filter(|p| p.email == email)
        .collect(),
    )
  }

  /// The payment bound to `token`, whatever its status.
  pub async fn get_by_token(&self, token: &str) -> Result<Option<PendingPayment>> {
    Ok(
      self
        .load()
        .await?
        .pending_payments
        .into_iter()
        .find(|p| p.registration_token == token),
    )
  }

  /// Mark a payment completed. Completing twice is a no-op.
  pub async fn complete(&self, id: Uuid) -> Result<PendingPayment> {
    self.transition(id, PaymentStatus::Completed).await
  }

  /// Mark a payment expired. Expiring twice is a no-op.
  pub async fn expire(&self, id: Uuid) -> Result<PendingPayment> {
    self.transition(id, PaymentStatus::Expired).await
  }

  /// Every payment still awaiting registration.
  pub async fn list_all_pending(&self) -> Result<Vec<PendingPayment>> {
    Ok(
      self
        .load()
        .await?
        .pending_payments
        .into_iter()
        .filter(PendingPayment::is_pending)
        .collect(),
    )
  }

  async fn transition(&self, id: Uuid, to: PaymentStatus) -> Result<PendingPayment> {
    let mut snapshot = self.load().await?;
    let now = self.clock.now();

    let payment = snapshot
      .pending_payments
      .iter_mut()
      .find(|p| p.id == id)
      .ok_or(lectern_core::Error::PaymentNotFound(id))?;

    match payment.status {
      from if from == to => return Ok(payment.clone()),
      PaymentStatus::Pending => {}
      from => {
        return Err(lectern_core::Error::InvalidTransition { id, from, to }.into());
      }
    }

    payment.status = to;
    if to == PaymentStatus::Completed {
      payment.completed_at = Some(now);
    }
    let updated = payment.clone();

    self.save(snapshot).await?;
    info!(payment = %id, status = %to, "pending payment updated");
    Ok(updated)
  }

  async fn load(&self) -> Result<Snapshot> {
    self.durable.load_snapshot().await.map_err(Error::store)
  }

  async fn save(&self, snapshot: Snapshot) -> Result<()> {
    self.durable.save_snapshot(snapshot).await.map_err(Error::store)
  }
}

fn malformed(msg: impl Into<String>) -> Error {
  lectern_core::Error::Malformed(msg.into()).into()
}

/// 32 bytes from the OS RNG, hex-encoded.
fn registration_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}
