//! lectern server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite durable and fallback stores, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `admin_password_hash`:
//!
//! ```
//! cargo run -p lectern-server --bin server -- --hash-password
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use lectern_core::memory::{MemoryDurableStore, MemoryFallbackStore};
use lectern_server::settings;
use lectern_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Lectern entitlement and payment-monitoring server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Keep all data in memory; nothing survives a restart.
  #[arg(long)]
  in_memory: bool,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = settings::load(cli.config).context("failed to load configuration")?;

  if cli.in_memory {
    tracing::warn!("running with in-memory stores");
    return lectern_server::serve(
      cfg,
      Arc::new(MemoryDurableStore::new()),
      Arc::new(MemoryFallbackStore::new()),
      shutdown_signal(),
    )
    .await;
  }

  let store_path = expand_tilde(&cfg.store_path);
  let durable = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  match durable.saved_at().await.context("failed to read snapshot timestamp")? {
    Some(at) => tracing::info!(saved_at = %at, path = ?store_path, "resuming from stored snapshot"),
    None => tracing::info!(path = ?store_path, "starting with an empty store"),
  }

  let fallback_path = expand_tilde(&cfg.fallback_path);
  let fallback = SqliteStore::open(&fallback_path)
    .await
    .with_context(|| format!("failed to open fallback store at {fallback_path:?}"))?;

  lectern_server::serve(cfg, Arc::new(durable), Arc::new(fallback), shutdown_signal())
    .await
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
