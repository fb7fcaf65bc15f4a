//! HTTP Basic-auth extractor and standalone verifier for admin routes.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use lectern_core::{
  notify::NotificationGateway,
  store::{DurableStore, FallbackStore},
};

use crate::{AppState, error::ApiError};

/// Credentials accepted for admin routes.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
}

/// Zero-size marker: present in the handler means the caller is an admin.
pub struct Admin;

/// The `(username, password)` pair of a `Basic` authorization header.
/// The password may itself contain `:`.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let encoded = headers
    .get(axum::http::header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Basic ")?;
  let decoded = String::from_utf8(B64.decode(encoded).ok()?).ok()?;
  let (username, password) = decoded.split_once(':')?;
  Some((username.to_owned(), password.to_owned()))
}

/// Verify Basic credentials from `headers` against `config`.
///
/// A stored hash that is not a valid PHC string rejects every request.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), ApiError> {
  let (username, password) = basic_credentials(headers).ok_or(ApiError::Unauthorized)?;
  if username != config.username {
    return Err(ApiError::Unauthorized);
  }

  let parsed_hash = PasswordHash::new(&config.password_hash).map_err(|e| {
    tracing::error!(error = %e, "configured admin password hash is unusable");
    ApiError::Unauthorized
  })?;

  Argon2::default()
    .verify_password(password.as_bytes(), &parsed_hash)
    .map_err(|_| ApiError::Unauthorized)
}

impl<D, F, N> FromRequestParts<AppState<D, F, N>> for Admin
where
  D: DurableStore + 'static,
  F: FallbackStore + 'static,
  N: NotificationGateway + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<D, F, N>,
  ) -> Result<Self, Self::Rejection> {
    if let Err(e) = verify_auth(&parts.headers, &state.auth) {
      tracing::debug!(path = %parts.uri.path(), "admin credentials rejected");
      return Err(e);
    }
    Ok(Admin)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use argon2::{PasswordHasher, password_hash::SaltString};
  use axum::http::{HeaderValue, header};
  use rand_core::OsRng;

  fn config(password: &str) -> AuthConfig {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .unwrap()
      .to_string();
    AuthConfig { username: "admin".to_string(), password_hash: hash }
  }

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  fn basic(user: &str, pass: &str) -> String {
    format!("Basic {}", B64.encode(format!("{user}:{pass}")))
  }

  #[test]
  fn accepts_the_configured_admin() {
    let cfg = config("s3cret:with:colons");
    assert!(verify_auth(&headers(&basic("admin", "s3cret:with:colons")), &cfg).is_ok());
  }

  #[test]
  fn rejects_everything_else() {
    let cfg = config("secret");
    let cases = [
      basic("admin", "wrong"),
      basic("Admin", "secret"),
      basic("admin", ""),
      format!("Basic {}", B64.encode("admin")),
      format!("Basic {}", B64.encode([0xff, 0xfe, b':', b'x'])),
      "Basic !!!not-base64!!!".to_string(),
      "Bearer secret".to_string(),
    ];
    for case in cases {
      assert!(
        matches!(verify_auth(&headers(&case), &cfg), Err(ApiError::Unauthorized)),
        "accepted {case:?}"
      );
    }
    assert!(matches!(
      verify_auth(&HeaderMap::new(), &cfg),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn unusable_stored_hash_rejects_instead_of_panicking() {
    let cfg = AuthConfig {
      username:      "admin".to_string(),
      password_hash: "not-a-phc-string".to_string(),
    };
    assert!(matches!(
      verify_auth(&headers(&basic("admin", "anything")), &cfg),
      Err(ApiError::Unauthorized)
    ));
  }
}
