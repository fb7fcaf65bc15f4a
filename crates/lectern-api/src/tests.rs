//! Router tests against in-memory backends and a simulated clock.

use std::sync::{Arc, Mutex};

use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, TimeDelta, Utc};
use lectern_core::{
  clock::{Clock, ManualClock},
  content::ContentItem,
  memory::{MemoryDurableStore, MemoryFallbackStore},
  notify::{NotificationGateway, OperationsAlert, PurchaseSummary, TransactionalKind},
  payment::Urgency,
  snapshot::Snapshot,
};
use lectern_engine::{
  AccessResolver, EntitlementStore, MonitorConfig, PaymentMonitor,
  PendingRegistrationStore,
};
use rand_core::OsRng;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, AuthConfig, api_router};

// ─── Fixture ─────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("never fails")]
struct Never;

/// Accepts everything and remembers transactional sends.
#[derive(Debug, Clone, Default)]
struct OutboxGateway {
  transactional: Arc<Mutex<Vec<(TransactionalKind, String)>>>,
}

impl OutboxGateway {
  fn transactional(&self) -> Vec<(TransactionalKind, String)> {
    self.transactional.lock().unwrap().clone()
  }
}

impl NotificationGateway for OutboxGateway {
  type Error = Never;

  async fn send_customer_reminder(
    &self,
    _email: &str,
    _urgency: Urgency,
    _summary: &PurchaseSummary,
  ) -> Result<bool, Never> {
    Ok(true)
  }

  async fn send_operations_alert(
    &self,
    _subject: &str,
    _details: &OperationsAlert,
  ) -> Result<bool, Never> {
    Ok(true)
  }

  async fn send_transactional(
    &self,
    kind: TransactionalKind,
    recipient: &str,
    _template_data: Value,
  ) -> Result<bool, Never> {
    self
      .transactional
      .lock()
      .unwrap()
      .push((kind, recipient.to_owned()));
    Ok(true)
  }
}

struct Fixture {
  app:     Router,
  clock:   ManualClock,
  gateway: Arc<OutboxGateway>,
}

fn start_time() -> DateTime<Utc> {
  "2024-06-01T09:00:00Z".parse().unwrap()
}

fn fixture() -> Fixture {
  let clock = ManualClock::new(start_time());
  let shared_clock: Arc<dyn Clock> = Arc::new(clock.clone());

  let catalog = Snapshot {
    content: vec![
      ContentItem::new("intro", None),
      ContentItem::new("masterclass", Some(49.0)),
    ],
    ..Snapshot::default()
  };
  let durable = Arc::new(MemoryDurableStore::with_snapshot(catalog));
  let fallback = Arc::new(MemoryFallbackStore::new());
  let gateway = Arc::new(OutboxGateway::default());

  let entitlements = Arc::new(EntitlementStore::new(
    durable.clone(),
    fallback,
    shared_clock.clone(),
  ));
  let pending = Arc::new(PendingRegistrationStore::new(
    durable.clone(),
    shared_clock.clone(),
  ));
  let monitor = Arc::new(PaymentMonitor::new(
    pending.clone(),
    durable.clone(),
    gateway.clone(),
    shared_clock,
    MonitorConfig::default(),
  ));

  let salt = SaltString::generate(&mut OsRng);
  let password_hash = Argon2::default()
    .hash_password(b"secret", &salt)
    .unwrap()
    .to_string();

  let state = AppState {
    durable,
    access: Arc::new(AccessResolver::new(entitlements.clone())),
    entitlements,
    pending,
    monitor,
    gateway: gateway.clone(),
    auth: Arc::new(AuthConfig { username: "admin".into(), password_hash }),
  };

  Fixture { app: api_router(state), clock, gateway }
}

fn admin_auth() -> String {
  format!("Basic {}", B64.encode("admin:secret"))
}

fn request(method: Method, uri: &str, body: Option<Value>, admin: bool) -> Request<Body> {
  request_with(method, uri, body, admin.then(admin_auth))
}

fn request_with(
  method: Method,
  uri: &str,
  body: Option<Value>,
  authorization: Option<String>,
) -> Request<Body> {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(value) = authorization {
    builder = builder.header(header::AUTHORIZATION, value);
  }
  match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  }
}

impl Fixture {
  async fn call(&self, req: Request<Body>) -> (StatusCode, Value) {
    let resp = self.app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let body = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
  }

  async fn checkout(&self, email: &str) -> Value {
    let body = json!({
      "email": email,
      "items": [{ "contentRef": "masterclass", "name": "Masterclass", "price": 49.0 }],
      "total": 49.0,
    });
    let (status, payment) = self
      .call(request(Method::POST, "/checkout/pending", Some(body), false))
      .await;
    assert_eq!(status, StatusCode::CREATED);
    payment
  }
}

// ─── Access ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn free_content_is_open_to_anonymous_visitors() {
  let f = fixture();
  let (status, decision) = f
    .call(request(
      Method::POST,
      "/access",
      Some(json!({ "contentId": "intro" })),
      true,
    ))
    .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(decision["hasAccess"], true);
  assert_eq!(decision["reason"], "Free content");
}

#[tokio::test]
async fn priced_content_needs_a_principal() {
  let f = fixture();
  let (status, decision) = f
    .call(request(
      Method::POST,
      "/access",
      Some(json!({ "contentId": "masterclass" })),
      true,
    ))
    .await;

  assert_eq!(status, StatusCode::OK);
  assert_eq!(decision["hasAccess"], false);
  assert_eq!(decision["reason"], "User not logged in");
}

#[tokio::test]
async fn unknown_content_is_not_found() {
  let f = fixture();
  let (status, body) = f
    .call(request(
      Method::POST,
      "/access",
      Some(json!({ "contentId": "missing" })),
      true,
    ))
    .await;

  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn access_ignores_caller_supplied_entitlements() {
  let f = fixture();
  let forged = json!({
    "principalId": "mallory",
    "contentId": "masterclass",
    "hints": [{
      "id": uuid::Uuid::new_v4(),
      "principalId": "mallory",
      "contentId": "masterclass",
      "status": "completed",
      "createdAt": "2024-06-01T09:00:00Z",
    }],
  });

  let (status, _) = f
    .call(request(Method::POST, "/access", Some(forged.clone()), false))
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, decision) = f
    .call(request(Method::POST, "/access", Some(forged), true))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decision["hasAccess"], false);
  assert_eq!(decision["requiresPurchase"], true);
}

#[tokio::test]
async fn recorded_purchase_grants_access() {
  let f = fixture();
  let access = json!({ "principalId": "alice", "contentId": "masterclass" });

  let (_, before) = f
    .call(request(Method::POST, "/access", Some(access.clone()), true))
    .await;
  assert_eq!(before["hasAccess"], false);
  assert_eq!(before["requiresPurchase"], true);
  assert_eq!(before["reason"], "Purchase required - $49");

  let (status, _) = f
    .call(request(
      Method::POST,
      "/purchases",
      Some(json!({
        "principalId": "alice",
        "contentId": "masterclass",
        "amount": 49.0,
        "email": "alice@example.com",
      })),
      true,
    ))
    .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, after) = f
    .call(request(Method::POST, "/access", Some(access), true))
    .await;
  assert_eq!(after["hasAccess"], true);
  assert_eq!(after["reason"], "Purchased content");

  let (_, list) = f
    .call(request(Method::GET, "/principals/alice/entitlements", None, true))
    .await;
  assert_eq!(list.as_array().unwrap().len(), 1);

  assert_eq!(
    f.gateway.transactional(),
    vec![(TransactionalKind::PurchaseConfirmation, "alice@example.com".to_string())]
  );
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Every route behind the `Admin` extractor.
const ADMIN_ROUTES: [(Method, &str); 12] = [
  (Method::POST, "/access"),
  (Method::POST, "/purchases"),
  (Method::GET, "/principals/alice/entitlements"),
  (Method::POST, "/cache/clear"),
  (Method::GET, "/payments/pending"),
  (Method::POST, "/payments/00000000-0000-0000-0000-000000000000/complete"),
  (Method::POST, "/payments/00000000-0000-0000-0000-000000000000/expire"),
  (Method::GET, "/payments/overdue"),
  (Method::GET, "/payments/alerts"),
  (Method::GET, "/payments/stats"),
  (Method::POST, "/payments/reminders"),
  (Method::GET, "/payments/pending?email=a@example.com"),
];

#[tokio::test]
async fn admin_routes_reject_missing_or_wrong_credentials() {
  let f = fixture();
  let wrong = [
    None,
    Some(format!("Basic {}", B64.encode("admin:guess"))),
    Some(format!("Basic {}", B64.encode("mallory:secret"))),
    Some("Bearer secret".to_string()),
  ];

  for (method, uri) in ADMIN_ROUTES {
    for authorization in wrong.clone() {
      let resp = f
        .app
        .clone()
        .oneshot(request_with(method.clone(), uri, None, authorization))
        .await
        .unwrap();
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
      assert_eq!(
        resp.headers()[header::WWW_AUTHENTICATE],
        r#"Basic realm="lectern""#,
        "{method} {uri}"
      );
    }
  }
}

#[tokio::test]
async fn checkout_hooks_need_no_credentials() {
  let f = fixture();
  let payment = f.checkout("ivy@example.com").await;
  let token = payment["registrationToken"].as_str().unwrap();

  let (status, _) = f
    .call(request(Method::GET, &format!("/registration/{token}"), None, false))
    .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cache_clear_with_credentials() {
  let f = fixture();
  let (status, _) = f
    .call(request(Method::POST, "/cache/clear", None, true))
    .await;
  assert_eq!(status, StatusCode::NO_CONTENT);
}

// ─── Checkout & registration ─────────────────────────────────────────────────

#[tokio::test]
async fn checkout_stores_payment_and_sends_invite() {
  let f = fixture();
  let payment = f.checkout("  Bob@Example.com ").await;

  assert_eq!(payment["email"], "bob@example.com");
  assert_eq!(payment["status"], "pending");

  let token = payment["registrationToken"].as_str().unwrap();
  let (status, found) = f
    .call(request(Method::GET, &format!("/registration/{token}"), None, false))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(found["id"], payment["id"]);

  assert_eq!(
    f.gateway.transactional(),
    vec![(TransactionalKind::RegistrationInvite, "bob@example.com".to_string())]
  );
}

#[tokio::test]
async fn checkout_rejects_malformed_email() {
  let f = fixture();
  let body = json!({ "email": "not-an-email", "items": [], "total": 0.0 });
  let (status, _) = f
    .call(request(Method::POST, "/checkout/pending", Some(body), false))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_registration_token_is_not_found() {
  let f = fixture();
  let (status, _) = f
    .call(request(Method::GET, "/registration/deadbeef", None, false))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Payments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn complete_sends_welcome_then_expire_conflicts() {
  let f = fixture();
  let payment = f.checkout("carol@example.com").await;
  let id = payment["id"].as_str().unwrap();

  let (status, done) = f
    .call(request(Method::POST, &format!("/payments/{id}/complete"), None, true))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["status"], "completed");
  assert!(
    f.gateway
      .transactional()
      .contains(&(TransactionalKind::Welcome, "carol@example.com".to_string()))
  );

  let (status, _) = f
    .call(request(Method::POST, &format!("/payments/{id}/expire"), None, true))
    .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, pending) = f
    .call(request(Method::GET, "/payments/pending", None, true))
    .await;
  assert!(pending.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_payment_is_not_found() {
  let f = fixture();
  let id = uuid::Uuid::new_v4();
  let (status, _) = f
    .call(request(Method::POST, &format!("/payments/{id}/complete"), None, true))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_filters_by_email() {
  let f = fixture();
  f.checkout("dave@example.com").await;
  f.checkout("erin@example.com").await;

  let (_, all) = f
    .call(request(Method::GET, "/payments/pending", None, true))
    .await;
  assert_eq!(all.as_array().unwrap().len(), 2);

  let (_, dave) = f
    .call(request(
      Method::GET,
      "/payments/pending?email=DAVE@example.com",
      None,
      true,
    ))
    .await;
  assert_eq!(dave.as_array().unwrap().len(), 1);
  assert_eq!(dave[0]["email"], "dave@example.com");
}

#[tokio::test]
async fn stats_and_overdue_follow_the_clock() {
  let f = fixture();
  f.checkout("frank@example.com").await;

  let (_, stats) = f
    .call(request(Method::GET, "/payments/stats", None, true))
    .await;
  assert_eq!(stats["totalPending"], 1);
  assert_eq!(stats["overdue24h"], 0);

  f.clock.advance(TimeDelta::hours(30));

  let (_, stats) = f
    .call(request(Method::GET, "/payments/stats", None, true))
    .await;
  assert_eq!(stats["overdue24h"], 1);
  assert_eq!(stats["overdue48h"], 0);

  let (_, overdue) = f
    .call(request(Method::GET, "/payments/overdue", None, true))
    .await;
  assert_eq!(overdue[0]["email"], "frank@example.com");
  assert_eq!(overdue[0]["elapsedHours"], 30.0);
}

#[tokio::test]
async fn manual_reminder_is_journaled() {
  let f = fixture();
  let payment = f.checkout("gina@example.com").await;

  let body = json!({
    "email": "gina@example.com",
    "registrationToken": payment["registrationToken"],
    "items": payment["items"],
    "total": 49.0,
  });
  let (status, result) = f
    .call(request(Method::POST, "/payments/reminders", Some(body), true))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(result["sent"], true);

  let (_, alerts) = f
    .call(request(Method::GET, "/payments/alerts", None, true))
    .await;
  assert_eq!(alerts[0]["alertType"], "manual");
  assert_eq!(alerts[0]["status"], "sent");
}

#[tokio::test]
async fn manual_reminder_with_unknown_token_is_not_sent() {
  let f = fixture();
  let body = json!({
    "email": "hal@example.com",
    "registrationToken": "nope",
    "items": [],
    "total": 0.0,
  });
  let (_, result) = f
    .call(request(Method::POST, "/payments/reminders", Some(body), true))
    .await;
  assert_eq!(result["sent"], false);
}
