//! Entitlement resolution and payment monitoring for Lectern.
//!
//! Every service here is generic over the storage and notification traits
//! from [`lectern_core`] and takes a [`Clock`](lectern_core::clock::Clock),
//! so the composition root decides what backs them and tests can run the
//! whole alert ladder on simulated time.

mod error;

pub mod access;
pub mod entitlements;
pub mod monitor;
pub mod pending;
pub mod scheduler;

pub use access::{AccessDecision, AccessResolver};
pub use entitlements::EntitlementStore;
pub use error::{Error, Result};
pub use monitor::{MonitorConfig, PaymentMonitor, PaymentStats, ScanReport};
pub use pending::PendingRegistrationStore;

#[cfg(test)]
mod testing;
