//! Runtime configuration: `config.toml` layered under `LECTERN_*` environment
//! variables.
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `LECTERN_MONITOR__SCAN_INTERVAL_SECS=600`.

use std::{path::PathBuf, time::Duration};

use config::{Config, ConfigError, Environment, File, Source};
use lectern_engine::MonitorConfig;
use serde::Deserialize;

/// Runtime server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  /// SQLite file holding the durable snapshot.
  pub store_path:          PathBuf,
  /// SQLite file holding the fallback key/value entries.
  pub fallback_path:       PathBuf,
  pub admin_username:      String,
  /// PHC string produced by argon2 (see `--hash-password`).
  pub admin_password_hash: String,
  /// Recipient of operations alerts.
  pub ops_email:           String,
  #[serde(default)]
  pub monitor:             MonitorSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorSettings {
  pub scan_interval_secs: u64,
  pub send_timeout_secs:  u64,
}

impl Default for MonitorSettings {
  fn default() -> Self { Self { scan_interval_secs: 60 * 60, send_timeout_secs: 30 } }
}

impl From<&MonitorSettings> for MonitorConfig {
  fn from(s: &MonitorSettings) -> Self {
    Self {
      scan_interval: Duration::from_secs(s.scan_interval_secs.max(1)),
      send_timeout:  Duration::from_secs(s.send_timeout_secs.max(1)),
    }
  }
}

/// Read `path` (optional) and the environment into a [`ServerConfig`].
pub fn load(path: PathBuf) -> Result<ServerConfig, ConfigError> {
  build(File::from(path).required(false))
}

pub(crate) fn build<S>(file: S) -> Result<ServerConfig, ConfigError>
where
  S: Source + Send + Sync + 'static,
{
  Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("store_path", "lectern.sqlite")?
    .set_default("fallback_path", "lectern-fallback.sqlite")?
    .set_default("admin_username", "admin")?
    .add_source(file)
    .add_source(
      Environment::with_prefix("LECTERN")
        .prefix_separator("_")
        .separator("__"),
    )
    .build()?
    .try_deserialize()
}
