//! Payments collected before registration, and the alert ledger that tracks
//! reminders about them.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, content::ContentId};

// ─── Pending payments ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Expired,
}

impl fmt::Display for PaymentStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Pending => "pending",
      Self::Completed => "completed",
      Self::Expired => "expired",
    })
  }
}

/// One line of a checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentItem {
  pub content_ref: ContentId,
  pub name:        String,
  pub price:       f64,
}

/// A payment collected from a buyer who has not finished registering.
///
/// Records are never deleted; only `status` (and `completed_at`) change, and
/// only forward out of `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
  pub id:                 Uuid,
  pub email:              String,
  pub items:              Vec<PaymentItem>,
  pub total:              f64,
  pub payment_date:       DateTime<Utc>,
  pub status:             PaymentStatus,
  /// Opaque value binding a later registration to this payment.
  pub registration_token: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at:       Option<DateTime<Utc>>,
}

impl PendingPayment {
  pub fn is_pending(&self) -> bool { self.status == PaymentStatus::Pending }

  /// Hours elapsed since payment, as of `now`.
  pub fn elapsed_hours(&self, now: DateTime<Utc>) -> f64 {
    (now - self.payment_date).num_milliseconds() as f64 / 3_600_000.0
  }
}

/// Trim and lowercase an email address, rejecting obviously malformed input.
pub fn normalize_email(email: &str) -> Result<String> {
  let email = email.trim().to_lowercase();
  let Some((local, domain)) = email.split_once('@') else {
    return Err(Error::Malformed(format!("email {email:?} has no '@'")));
  };
  let domain_ok = domain.contains('.')
    && !domain.starts_with('.')
    && !domain.ends_with('.')
    && !domain.contains('@');
  if local.is_empty() || !domain_ok || email.chars().any(char::is_whitespace) {
    return Err(Error::Malformed(format!("email {email:?} is not valid")));
  }
  Ok(email)
}

// ─── Alert ledger ────────────────────────────────────────────────────────────

/// A rung of the reminder ladder, or an out-of-band manual reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
  #[serde(rename = "24h")]
  Hours24,
  #[serde(rename = "48h")]
  Hours48,
  #[serde(rename = "72h")]
  Hours72,
  #[serde(rename = "weekly")]
  Weekly,
  /// Admin-triggered; recorded for history, never a ladder step.
  #[serde(rename = "manual")]
  Manual,
}

impl AlertType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Hours24 => "24h",
      Self::Hours48 => "48h",
      Self::Hours72 => "72h",
      Self::Weekly => "weekly",
      Self::Manual => "manual",
    }
  }

  /// Whether this is a step of the escalation ladder. Only ladder rungs take
  /// part in the one-`sent`-entry-per-payment idempotency guard; `Manual`
  /// entries are an audit trail and may repeat.
  pub fn is_ladder_rung(self) -> bool { !matches!(self, Self::Manual) }

  /// How insistent the customer-facing reminder should be.
  pub fn urgency(self) -> Urgency {
    match self {
      Self::Hours24 => Urgency::Gentle,
      Self::Hours48 | Self::Manual => Urgency::Reminder,
      Self::Hours72 => Urgency::Urgent,
      Self::Weekly => Urgency::Final,
    }
  }
}

impl fmt::Display for AlertType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Tone of a customer reminder, in increasing order of urgency.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
  Gentle,
  Reminder,
  Urgent,
  Final,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
  Sent,
  Failed,
}

/// One entry of the append-only alert ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAlert {
  pub id:         Uuid,
  pub payment_id: Uuid,
  pub email:      String,
  pub alert_type: AlertType,
  pub sent_at:    DateTime<Utc>,
  pub status:     AlertStatus,
}

impl PaymentAlert {
  /// Whether this entry satisfies the idempotency guard for
  /// `(payment_id, alert_type)`. Never true for manual reminders.
  pub fn settles(&self, payment_id: Uuid, alert_type: AlertType) -> bool {
    alert_type.is_ladder_rung()
      && self.payment_id == payment_id
      && self.alert_type == alert_type
      && self.status == AlertStatus::Sent
  }
}
