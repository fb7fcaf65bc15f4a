//! [`PaymentMonitor`]: escalating reminders for buyers who paid but never
//! registered.
//!
//! Each pending payment climbs [`ALERT_LADDER`] one rung at a time:
//!
//! ```text
//! NoAlert → 24h → 48h → 72h → weekly
//! ```
//!
//! A scan cycle picks, per payment, the lowest rung whose threshold has been
//! crossed and which has no `sent` ledger entry yet, and attempts only that
//! one. A payment that aged past several thresholds between cycles catches
//! up over the following cycles. Failed attempts are journaled too, but only
//! a `sent` entry settles a rung, so failures are retried next cycle.

use std::{
  collections::HashSet,
  fmt::Display,
  future::Future,
  sync::{Arc, Mutex},
  time::Duration,
};

use lectern_core::{
  clock::Clock,
  notify::{NotificationGateway, OperationsAlert, PurchaseSummary},
  payment::{
    AlertStatus, AlertType, PaymentAlert, PaymentItem, PendingPayment, normalize_email,
  },
  store::DurableStore,
};
use serde::Serialize;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{Error, Result, pending::PendingRegistrationStore, scheduler::PeriodicTask};

/// `(threshold in hours, rung)`, lowest first.
pub const ALERT_LADDER: [(f64, AlertType); 4] = [
  (24.0, AlertType::Hours24),
  (48.0, AlertType::Hours48),
  (72.0, AlertType::Hours72),
  (168.0, AlertType::Weekly),
];

/// Hours after which a pending payment counts as overdue.
pub const OVERDUE_AFTER_HOURS: f64 = ALERT_LADDER[0].0;

// ─── Configuration & reports ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MonitorConfig {
  /// Time between scan cycles.
  pub scan_interval: Duration,
  /// Upper bound on any single gateway call.
  pub send_timeout:  Duration,
}

impl Default for MonitorConfig {
  fn default() -> Self {
    Self {
      scan_interval: Duration::from_secs(60 * 60),
      send_timeout:  Duration::from_secs(30),
    }
  }
}

/// What one scan cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
  pub scanned: usize,
  pub alerted: usize,
  pub failed:  usize,
}

/// Pending payments bucketed by the highest threshold each has crossed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
  pub total_pending: usize,
  pub overdue_24h:   usize,
  pub overdue_48h:   usize,
  pub overdue_72h:   usize,
  pub overdue_week:  usize,
}

/// A pending payment past [`OVERDUE_AFTER_HOURS`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverduePayment {
  #[serde(flatten)]
  pub payment:       PendingPayment,
  pub elapsed_hours: f64,
}

// ─── Monitor ─────────────────────────────────────────────────────────────────

pub struct PaymentMonitor<D, N> {
  pending: Arc<PendingRegistrationStore<D>>,
  durable: Arc<D>,
  gateway: Arc<N>,
  clock:   Arc<dyn Clock>,
  config:  MonitorConfig,
  /// Rungs sent by this process. Guards against a repeat send when the
  /// ledger write after a successful send did not stick.
  sent:    Mutex<HashSet<(Uuid, AlertType)>>,
  task:    Mutex<Option<PeriodicTask>>,
}

impl<D, N> PaymentMonitor<D, N>
where
  D: DurableStore,
  N: NotificationGateway,
{
  pub fn new(
    pending: Arc<PendingRegistrationStore<D>>,
    durable: Arc<D>,
    gateway: Arc<N>,
    clock: Arc<dyn Clock>,
    config: MonitorConfig,
  ) -> Self {
    Self {
      pending,
      durable,
      gateway,
      clock,
      config,
      sent: Mutex::new(HashSet::new()),
      task: Mutex::new(None),
    }
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Run a scan now and then every `scan_interval`. Does nothing if already
  /// running.
  pub fn start(self: &Arc<Self>)
  where
    D: 'static,
    N: 'static,
  {
    let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
    if task.is_some() {
      debug!("payment monitor already running");
      return;
    }

    let monitor = Arc::downgrade(self);
    *task = Some(PeriodicTask::spawn(self.config.scan_interval, move || {
      let monitor = monitor.clone();
      async move {
        if let Some(monitor) = monitor.upgrade() {
          monitor.scan_cycle().await;
        }
      }
    }));

    info!(
      interval_secs = self.config.scan_interval.as_secs(),
      "payment monitor started"
    );
  }

  /// Stop scheduling scans. A cycle already running finishes. Calling this
  /// again is a no-op.
  pub fn stop(&self) {
    let task = self.task.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(task) = task {
      task.cancel();
      info!("payment monitor stopped");
    }
  }

  pub fn is_running(&self) -> bool {
    self.task.lock().unwrap_or_else(|e| e.into_inner()).is_some()
  }

  // ── Scanning ──────────────────────────────────────────────────────────

  /// One pass over every pending payment, sequentially. At most one alert
  /// attempt per payment.
  pub async fn scan_cycle(&self) -> ScanReport {
    let mut report = ScanReport::default();

    let payments = match self.pending.list_all_pending().await {
      Ok(p) => p,
      Err(e) => {
        error!(error = %e, "scan aborted: pending payments unavailable");
        return report;
      }
    };
    let ledger = match self.load_ledger().await {
      Ok(l) => l,
      Err(e) => {
        error!(error = %e, "scan aborted: alert ledger unavailable");
        return report;
      }
    };

    let now = self.clock.now();
    for payment in &payments {
      report.scanned += 1;
      let elapsed = payment.elapsed_hours(now);
      let Some(alert_type) = self.next_rung(payment.id, elapsed, &ledger) else {
        continue;
      };

      match self.send_alert(payment, alert_type).await {
        Some(AlertStatus::Sent) => report.alerted += 1,
        Some(AlertStatus::Failed) => report.failed += 1,
        None => {}
      }
    }

    info!(
      scanned = report.scanned,
      alerted = report.alerted,
      failed = report.failed,
      "payment scan finished"
    );
    report
  }

  /// The lowest crossed rung with no `sent` entry.
  fn next_rung(
    &self,
    payment_id: Uuid,
    elapsed_hours: f64,
    ledger: &[PaymentAlert],
  ) -> Option<AlertType> {
    ALERT_LADDER
      .iter()
      .filter(|(threshold, _)| elapsed_hours >= *threshold)
      .map(|(_, alert_type)| *alert_type)
      .find(|alert_type| !self.settled(payment_id, *alert_type, ledger))
  }

  fn settled(&self, payment_id: Uuid, alert_type: AlertType, ledger: &[PaymentAlert]) -> bool {
    self
      .sent
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .contains(&(payment_id, alert_type))
      || ledger.iter().any(|a| a.settles(payment_id, alert_type))
  }

  /// Send the customer reminder and the operations alert for one rung, then
  /// journal the attempt.
  ///
  /// Returns `None` without sending if `alert_type` is not a ladder rung, if
  /// the rung is already settled, or if the ledger cannot be read to find
  /// out.
  pub async fn send_alert(
    &self,
    payment: &PendingPayment,
    alert_type: AlertType,
  ) -> Option<AlertStatus> {
    if !alert_type.is_ladder_rung() {
      warn!(payment = %payment.id, %alert_type, "alert skipped: not a ladder rung");
      return None;
    }
    let ledger = match self.load_ledger().await {
      Ok(l) => l,
      Err(e) => {
        warn!(payment = %payment.id, %alert_type, error = %e, "alert skipped: ledger unavailable");
        return None;
      }
    };
    if self.settled(payment.id, alert_type, &ledger) {
      trace!(payment = %payment.id, %alert_type, "alert already sent");
      return None;
    }

    let elapsed_hours = payment.elapsed_hours(self.clock.now());
    let summary = PurchaseSummary {
      items:              payment.items.clone(),
      total:              payment.total,
      registration_token: payment.registration_token.clone(),
      payment_date:       Some(payment.payment_date),
    };
    let details = OperationsAlert {
      customer_email: payment.email.clone(),
      amount: payment.total,
      items: payment.items.clone(),
      registration_token: payment.registration_token.clone(),
      elapsed_hours,
      alert_type,
    };
    let subject = format!(
      "[{alert_type}] Unregistered payment of ${} from {} ({elapsed_hours:.0}h)",
      payment.total, payment.email
    );

    let customer = self
      .bounded(
        "customer reminder",
        self.gateway.send_customer_reminder(
          &payment.email,
          alert_type.urgency(),
          &summary,
        ),
      )
      .await;
    let operations = self
      .bounded(
        "operations alert",
        self.gateway.send_operations_alert(&subject, &details),
      )
      .await;

    let status = if customer && operations {
      self
        .sent
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert((payment.id, alert_type));
      AlertStatus::Sent
    } else {
      AlertStatus::Failed
    };

    self.journal(payment.id, &payment.email, alert_type, status).await;
    info!(payment = %payment.id, %alert_type, ?status, elapsed_hours, "payment alert attempted");
    Some(status)
  }

  /// An admin-triggered reminder outside the ladder. Journaled as a `manual`
  /// entry, which never settles a ladder rung.
  pub async fn send_manual_reminder(
    &self,
    email: &str,
    token: &str,
    items: Vec<PaymentItem>,
    total: f64,
  ) -> bool {
    let email = match normalize_email(email) {
      Ok(e) => e,
      Err(e) => {
        warn!(error = %e, "manual reminder rejected");
        return false;
      }
    };
    let payment = match self.pending.get_by_token(token).await {
      Ok(Some(p)) => p,
      Ok(None) => {
        warn!(%email, "manual reminder for unknown registration token");
        return false;
      }
      Err(e) => {
        warn!(%email, error = %e, "manual reminder: payment lookup failed");
        return false;
      }
    };

    let summary = PurchaseSummary {
      items,
      total,
      registration_token: token.to_owned(),
      payment_date: Some(payment.payment_date),
    };
    let delivered = self
      .bounded(
        "manual reminder",
        self.gateway.send_customer_reminder(
          &email,
          AlertType::Manual.urgency(),
          &summary,
        ),
      )
      .await;

    let status = if delivered { AlertStatus::Sent } else { AlertStatus::Failed };
    self.journal(payment.id, &email, AlertType::Manual, status).await;
    info!(payment = %payment.id, %email, ?status, "manual reminder attempted");
    delivered
  }

  /// Await one gateway call, bounded by `send_timeout`. Errors, timeouts and
  /// declined messages all count as not delivered.
  async fn bounded<E: Display>(
    &self,
    what: &'static str,
    call: impl Future<Output = Result<bool, E>>,
  ) -> bool {
    match tokio::time::timeout(self.config.send_timeout, call).await {
      Ok(Ok(true)) => true,
      Ok(Ok(false)) => {
        warn!(what, "gateway declined message");
        false
      }
      Ok(Err(e)) => {
        warn!(what, error = %e, "gateway send failed");
        false
      }
      Err(_) => {
        warn!(
          what,
          timeout_ms = self.config.send_timeout.as_millis() as u64,
          "gateway send timed out"
        );
        false
      }
    }
  }

  // ── Ledger ────────────────────────────────────────────────────────────

  async fn load_ledger(&self) -> Result<Vec<PaymentAlert>> {
    let snapshot = self.durable.load_snapshot().await.map_err(Error::store)?;
    Ok(snapshot.payment_alerts)
  }

  async fn journal(
    &self,
    payment_id: Uuid,
    email: &str,
    alert_type: AlertType,
    status: AlertStatus,
  ) {
    let entry = PaymentAlert {
      id: Uuid::new_v4(),
      payment_id,
      email: email.to_owned(),
      alert_type,
      sent_at: self.clock.now(),
      status,
    };

    let result = async {
      let mut snapshot = self.durable.load_snapshot().await.map_err(Error::store)?;
      snapshot.payment_alerts.push(entry);
      self.durable.save_snapshot(snapshot).await.map_err(Error::store)
    }
    .await;

    if let Err(e) = result {
      error!(payment = %payment_id, %alert_type, error = %e, "alert not journaled");
    }
  }

  // ── Operational queries ───────────────────────────────────────────────

  /// Pending payments at least [`OVERDUE_AFTER_HOURS`] old, oldest first.
  pub async fn list_overdue(&self) -> Result<Vec<OverduePayment>> {
    let now = self.clock.now();
    let mut overdue: Vec<OverduePayment> = self
      .pending
      .list_all_pending()
      .await?
      .into_iter()
      .map(|payment| OverduePayment {
        elapsed_hours: payment.elapsed_hours(now),
        payment,
      })
      .filter(|o| o.elapsed_hours >= OVERDUE_AFTER_HOURS)
      .collect();

    overdue.sort_by(|a, b| b.elapsed_hours.total_cmp(&a.elapsed_hours));
    Ok(overdue)
  }

  /// Every ledger entry, newest first.
  pub async fn list_alert_history(&self) -> Result<Vec<PaymentAlert>> {
    let mut history = self.load_ledger().await?;
    history.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
    Ok(history)
  }

  /// Bucket each pending payment under the highest threshold it crossed.
  pub async fn compute_stats(&self) -> Result<PaymentStats> {
    let now = self.clock.now();
    let pending = self.pending.list_all_pending().await?;

    let mut stats = PaymentStats { total_pending: pending.len(), ..Default::default() };
    for payment in &pending {
      match highest_crossed(payment.elapsed_hours(now)) {
        Some(AlertType::Hours24) => stats.overdue_24h += 1,
        Some(AlertType::Hours48) => stats.overdue_48h += 1,
        Some(AlertType::Hours72) => stats.overdue_72h += 1,
        Some(AlertType::Weekly) => stats.overdue_week += 1,
        Some(AlertType::Manual) | None => {}
      }
    }
    Ok(stats)
  }
}

fn highest_crossed(elapsed_hours: f64) -> Option<AlertType> {
  ALERT_LADDER
    .iter()
    .rev()
    .find(|(threshold, _)| elapsed_hours >= *threshold)
    .map(|(_, alert_type)| *alert_type)
}
