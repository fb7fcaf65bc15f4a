//! [`SqliteStore`], the SQLite implementation of [`DurableStore`] and
//! [`FallbackStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use lectern_core::{
  snapshot::Snapshot,
  store::{DurableStore, FallbackStore},
};

use crate::{
  encode::{decode_dt, decode_snapshot, encode_dt, encode_snapshot},
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lectern store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// When the snapshot was last replaced, or `None` if it never was.
  pub async fn saved_at(&self) -> Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT saved_at FROM snapshot WHERE id = 1", [], |r| {
              r.get(0)
            })
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }
}

// ─── DurableStore impl ───────────────────────────────────────────────────────

impl DurableStore for SqliteStore {
  type Error = crate::Error;

  async fn load_snapshot(&self) -> Result<Snapshot> {
    let document: Option<String> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row("SELECT document FROM snapshot WHERE id = 1", [], |r| {
              r.get(0)
            })
            .optional()?,
        )
      })
      .await?;

    match document {
      Some(doc) => decode_snapshot(&doc),
      None => Ok(Snapshot::default()),
    }
  }

  async fn save_snapshot(&self, snapshot: Snapshot) -> Result<()> {
    let document = encode_snapshot(&snapshot)?;
    let saved_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO snapshot (id, document, saved_at) VALUES (1, ?1, ?2)
           ON CONFLICT(id) DO UPDATE
             SET document = excluded.document, saved_at = excluded.saved_at",
          rusqlite::params![document, saved_at],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!("snapshot saved");
    Ok(())
  }
}

// ─── FallbackStore impl ──────────────────────────────────────────────────────

impl FallbackStore for SqliteStore {
  type Error = crate::Error;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<Vec<u8>>> {
    let key = key.to_owned();
    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM kv WHERE key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> Result<()> {
    let key = key.to_owned();
    let updated_at = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
          rusqlite::params![key, value, updated_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list<'a>(&'a self, prefix: &'a str) -> Result<Vec<String>> {
    // Prefix match without LIKE so '%' and '_' in keys stay literal.
    let prefix = prefix.to_owned();
    let keys = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;
        let keys = stmt
          .query_map(rusqlite::params![prefix], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }
}
