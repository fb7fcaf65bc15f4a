//! Core types and trait definitions for the Lectern storefront core.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod clock;
pub mod content;
pub mod entitlement;
pub mod error;
pub mod memory;
pub mod notify;
pub mod payment;
pub mod principal;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
