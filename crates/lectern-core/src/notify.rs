//! The outbound notification contract.
//!
//! Concrete transports (SMTP, provider APIs) live outside the core. Every
//! call may fail; callers record failures instead of propagating them.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::payment::{AlertType, PaymentItem, Urgency};

/// What the customer is being reminded about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSummary {
  pub items:              Vec<PaymentItem>,
  pub total:              f64,
  pub registration_token: String,
  pub payment_date:       Option<DateTime<Utc>>,
}

/// Structured details attached to an operations alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationsAlert {
  pub customer_email:     String,
  pub amount:             f64,
  pub items:              Vec<PaymentItem>,
  pub registration_token: String,
  pub elapsed_hours:      f64,
  pub alert_type:         AlertType,
}

/// Transactional messages triggered by checkout and registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionalKind {
  Welcome,
  PurchaseConfirmation,
  RegistrationInvite,
}

pub trait NotificationGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Remind a buyer to finish registering. Returns `false` when the
  /// transport declined the message without erroring.
  fn send_customer_reminder<'a>(
    &'a self,
    email: &'a str,
    urgency: Urgency,
    summary: &'a PurchaseSummary,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn send_operations_alert<'a>(
    &'a self,
    subject: &'a str,
    details: &'a OperationsAlert,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  fn send_transactional<'a>(
    &'a self,
    kind: TransactionalKind,
    recipient: &'a str,
    template_data: serde_json::Value,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
