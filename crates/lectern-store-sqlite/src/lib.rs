//! SQLite backend for the Lectern storefront core.
//!
//! One [`SqliteStore`] implements both persistence traits: the whole-document
//! [`DurableStore`](lectern_core::store::DurableStore) snapshot and the
//! [`FallbackStore`](lectern_core::store::FallbackStore) key/value table. The
//! composition root opens two separate files so the sinks stay independent.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
