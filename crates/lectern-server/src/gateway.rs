//! [`LogGateway`]: a [`NotificationGateway`] that writes every message to the
//! log instead of a mail transport.

use std::convert::Infallible;

use lectern_core::{
  notify::{NotificationGateway, OperationsAlert, PurchaseSummary, TransactionalKind},
  payment::Urgency,
};
use tracing::info;

#[derive(Debug, Clone)]
pub struct LogGateway {
  ops_email: String,
}

impl LogGateway {
  pub fn new(ops_email: impl Into<String>) -> Self {
    Self { ops_email: ops_email.into() }
  }
}

impl NotificationGateway for LogGateway {
  type Error = Infallible;

  async fn send_customer_reminder(
    &self,
    email: &str,
    urgency: Urgency,
    summary: &PurchaseSummary,
  ) -> Result<bool, Infallible> {
    info!(
      target: "lectern::outbox",
      to = email,
      ?urgency,
      total = summary.total,
      items = summary.items.len(),
      token = %summary.registration_token,
      "customer reminder"
    );
    Ok(true)
  }

  async fn send_operations_alert(
    &self,
    subject: &str,
    details: &OperationsAlert,
  ) -> Result<bool, Infallible> {
    info!(
      target: "lectern::outbox",
      to = %self.ops_email,
      subject,
      customer = %details.customer_email,
      amount = details.amount,
      elapsed_hours = details.elapsed_hours,
      alert = %details.alert_type,
      "operations alert"
    );
    Ok(true)
  }

  async fn send_transactional(
    &self,
    kind: TransactionalKind,
    recipient: &str,
    template_data: serde_json::Value,
  ) -> Result<bool, Infallible> {
    info!(
      target: "lectern::outbox",
      to = recipient,
      ?kind,
      data = %template_data,
      "transactional message"
    );
    Ok(true)
  }
}
