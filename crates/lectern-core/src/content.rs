//! Content items: the purchasable units of video.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque content identifier.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ContentId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ContentId {
  fn from(s: String) -> Self { Self(s) }
}

/// A catalog entry. Only `price` and `demo` matter to access resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
  pub id:       ContentId,
  /// Absent or non-positive means free.
  #[serde(default)]
  pub price:    Option<f64>,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub title:    Option<String>,
  /// Demo previews are served to everyone.
  #[serde(default)]
  pub demo:     bool,
}

impl ContentItem {
  pub fn new(id: impl Into<ContentId>, price: Option<f64>) -> Self {
    Self {
      id: id.into(),
      price,
      category: None,
      title: None,
      demo: false,
    }
  }

  pub fn is_free(&self) -> bool { self.price.is_none_or(|p| p <= 0.0) }

  /// Price for display; free items report zero.
  pub fn display_price(&self) -> f64 { self.price.unwrap_or(0.0) }
}
