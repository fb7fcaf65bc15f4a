//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; the snapshot as compact JSON.

use chrono::{DateTime, Utc};
use lectern_core::snapshot::Snapshot;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String> {
  Ok(serde_json::to_string(snapshot)?)
}

pub fn decode_snapshot(s: &str) -> Result<Snapshot> {
  Ok(serde_json::from_str(s)?)
}
