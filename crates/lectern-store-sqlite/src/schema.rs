//! SQL schema for the Lectern SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- The durable snapshot is a single JSON document, replaced wholesale.
CREATE TABLE IF NOT EXISTS snapshot (
    id        INTEGER PRIMARY KEY CHECK (id = 1),
    document  TEXT NOT NULL,       -- JSON-encoded Snapshot
    saved_at  TEXT NOT NULL        -- ISO 8601 UTC
);

-- Fallback key/value entries, e.g. 'purchases:<principal>'.
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT PRIMARY KEY,
    value       BLOB NOT NULL,
    updated_at  TEXT NOT NULL
);

PRAGMA user_version = 1;
";
