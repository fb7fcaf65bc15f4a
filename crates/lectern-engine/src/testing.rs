//! Test doubles shared by the engine's unit tests.

use std::{
  sync::{Arc, Mutex},
  time::Duration,
};

use lectern_core::{
  notify::{NotificationGateway, OperationsAlert, PurchaseSummary, TransactionalKind},
  payment::Urgency,
};

#[derive(Debug, thiserror::Error)]
#[error("gateway down")]
pub struct GatewayDown;

/// How the gateway answers every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
  Deliver,
  Decline,
  Fail,
  Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
  Customer { email: String, urgency: Urgency },
  Operations { subject: String, details: OperationsAlert },
}

/// Records every call it receives and answers according to its [`Mode`].
#[derive(Debug, Clone)]
pub struct RecordingGateway {
  mode: Arc<Mutex<Mode>>,
  sent: Arc<Mutex<Vec<Sent>>>,
}

impl RecordingGateway {
  pub fn new() -> Self {
    Self {
      mode: Arc::new(Mutex::new(Mode::Deliver)),
      sent: Arc::new(Mutex::new(Vec::new())),
    }
  }

  pub fn set_mode(&self, mode: Mode) { *self.mode.lock().unwrap() = mode; }

  pub fn sent(&self) -> Vec<Sent> { self.sent.lock().unwrap().clone() }

  pub fn customer_urgencies(&self) -> Vec<Urgency> {
    self
      .sent()
      .into_iter()
      .filter_map(|s| match s {
        Sent::Customer { urgency, .. } => Some(urgency),
        _ => None,
      })
      .collect()
  }

  async fn answer(&self, call: Sent) -> Result<bool, GatewayDown> {
    self.sent.lock().unwrap().push(call);
    let mode = *self.mode.lock().unwrap();
    match mode {
      Mode::Deliver => Ok(true),
      Mode::Decline => Ok(false),
      Mode::Fail => Err(GatewayDown),
      Mode::Hang => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(true)
      }
    }
  }
}

impl NotificationGateway for RecordingGateway {
  type Error = GatewayDown;

  async fn send_customer_reminder(
    &self,
    email: &str,
    urgency: Urgency,
    _summary: &PurchaseSummary,
  ) -> Result<bool, GatewayDown> {
    self
      .answer(Sent::Customer { email: email.to_owned(), urgency })
      .await
  }

  async fn send_operations_alert(
    &self,
    subject: &str,
    details: &OperationsAlert,
  ) -> Result<bool, GatewayDown> {
    self
      .answer(Sent::Operations {
        subject: subject.to_owned(),
        details: details.clone(),
      })
      .await
  }

  async fn send_transactional(
    &self,
    kind: TransactionalKind,
    recipient: &str,
    _template_data: serde_json::Value,
  ) -> Result<bool, GatewayDown> {
    // Transactional mail belongs to the API layer.
    panic!("engine sent a {kind:?} message to {recipient}");
  }
}
